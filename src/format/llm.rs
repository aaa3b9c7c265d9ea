//! LLM text formatting client
//!
//! Talks to an OpenAI-compatible chat completions endpoint (LM Studio
//! by default) with streaming enabled, accumulating the delta chunks
//! into the formatted text. Requests are synchronous; callers run them
//! via spawn_blocking.

use crate::config::FormatConfig;
use crate::error::FormatError;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const INSTRUCTIONS: &str = "You will always only reply with the formatted text. \
Your sole job is to format the text. \
Read the entire text carefully and understand the context before formatting. \
Fix grammar, spelling, punctuation, and style issues without altering meaning. \
Convert spoken-out formats to their proper syntax (e.g., 'dot com' to '.com', \
'readme dot md' to 'readme.md', 'w w w dot' to 'www.', 'at symbol' to '@', \
'hashtag' to '#'). \
Fix spelling issues of names and coding terms like Vercel, Netlify, GitHub, \
func, def and others. \
For lists, ensure each item is on a new line.";

pub struct LlmFormatter {
    endpoint: String,
    model: String,
    temperature: f32,
    agent: ureq::Agent,
}

impl LlmFormatter {
    pub fn new(config: &FormatConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_read(REQUEST_TIMEOUT)
            .build();
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            agent,
        }
    }

    /// Format `text`, blocking until the stream finishes.
    pub fn format(&self, text: &str) -> Result<String, FormatError> {
        let user_message = format!(
            "{} This is the text the user wants you to format: \"{}\"",
            INSTRUCTIONS, text
        );

        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": user_message}],
            "temperature": self.temperature,
            "max_tokens": -1,
            "stream": true,
        });

        let start = std::time::Instant::now();
        tracing::debug!("Sending {} chars to {}", text.chars().count(), self.endpoint);

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(payload)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    FormatError::Api(format!("HTTP {}: {}", code, body))
                }
                ureq::Error::Transport(_) => FormatError::Connection(self.endpoint.clone()),
            })?;

        let result = collect_stream(BufReader::new(response.into_reader()))?;

        tracing::info!(
            "Formatting completed in {:.2}s ({} chars)",
            start.elapsed().as_secs_f32(),
            result.chars().count()
        );
        Ok(result)
    }
}

impl super::TextFormatter for LlmFormatter {
    fn format(&self, text: &str) -> Result<String, FormatError> {
        LlmFormatter::format(self, text)
    }
}

/// Accumulate an SSE chat-completions stream into the full response.
///
/// Each event line is `data: {json}`; the stream ends with
/// `data: [DONE]`. Malformed chunks are skipped.
fn collect_stream<R: BufRead>(reader: R) -> Result<String, FormatError> {
    let mut full = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| FormatError::Api(format!("stream read failed: {}", e)))?;
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data == "[DONE]" {
            break;
        }
        let Ok(chunk) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        if let Some(content) = chunk
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            full.push_str(content);
        }
    }
    Ok(full.trim().to_string())
}
