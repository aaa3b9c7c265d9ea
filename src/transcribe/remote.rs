//! Remote transcription via the OpenAI Whisper API
//!
//! Encodes the recording as WAV and uploads it as a multipart form.
//! The API key comes from the OPENAI_API_KEY environment variable and
//! is checked at construction, so a missing credential is a startup
//! error rather than a mid-dictation surprise.

use super::Transcriber;
use crate::config::TranscribeConfig;
use crate::error::TranscribeError;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote transcriber using the OpenAI-compatible transcriptions API
pub struct RemoteTranscriber {
    endpoint: String,
    model: String,
    language: String,
    api_key: String,
}

impl RemoteTranscriber {
    /// Create a remote transcriber from config
    pub fn new(config: &TranscribeConfig) -> Result<Self, TranscribeError> {
        let endpoint = config.endpoint.clone();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TranscribeError::ConfigError(format!(
                "transcribe.endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(TranscribeError::MissingApiKey)?;

        tracing::info!(
            "Configured remote transcriber: endpoint={}, model={}",
            endpoint,
            config.model
        );

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            language: config.language.clone(),
            api_key,
        })
    }

    /// Build the multipart form body for the API request
    fn build_multipart_body(&self, wav_data: &[u8]) -> (String, Vec<u8>) {
        let boundary = format!(
            "----PushtypeBoundary{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        let mut body = Vec::new();

        // File field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(wav_data);
        body.extend_from_slice(b"\r\n");

        // Model field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"model\"\r\n\r\n");
        body.extend_from_slice(self.model.as_bytes());
        body.extend_from_slice(b"\r\n");

        // Language field (omitted in auto-detect mode)
        if self.language != "auto" {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(b"Content-Disposition: form-data; name=\"language\"\r\n\r\n");
            body.extend_from_slice(self.language.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        // response_format field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"response_format\"\r\n\r\n");
        body.extend_from_slice(b"json\r\n");

        // End boundary
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (boundary, body)
    }
}

impl Transcriber for RemoteTranscriber {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, TranscribeError> {
        if samples.is_empty() {
            return Err(TranscribeError::AudioFormat("Empty audio buffer".into()));
        }

        let duration_secs = samples.len() as f32 / sample_rate as f32;
        tracing::debug!(
            "Sending {:.2}s of audio to {} ({} samples)",
            duration_secs,
            self.endpoint,
            samples.len()
        );

        let start = std::time::Instant::now();

        let wav_data = super::encode_wav(samples, sample_rate)?;
        let (boundary, body) = self.build_multipart_body(&wav_data);

        let response = ureq::post(&self.endpoint)
            .timeout(REQUEST_TIMEOUT)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_bytes(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    TranscribeError::RemoteError(format!("Server returned {}: {}", code, body))
                }
                ureq::Error::Transport(t) => {
                    TranscribeError::NetworkError(format!("Request failed: {}", t))
                }
            })?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| TranscribeError::RemoteError(format!("Failed to parse response: {}", e)))?;

        let text = json
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TranscribeError::RemoteError(format!("Response missing 'text' field: {}", json))
            })?
            .trim()
            .to_string();

        tracing::info!(
            "Remote transcription completed in {:.2}s ({} chars)",
            start.elapsed().as_secs_f32(),
            text.chars().count()
        );

        Ok(text)
    }
}
