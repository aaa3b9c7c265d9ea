//! Local transcription via a whisper-cli subprocess
//!
//! Uses whisper-cli (from whisper.cpp) as an external process, so no
//! GPU/FFI toolchain is needed in this binary. The whisper-cli binary
//! must be installed separately or built from whisper.cpp.

use super::Transcriber;
use crate::config::TranscribeConfig;
use crate::error::TranscribeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// CLI-based transcriber using a whisper-cli subprocess
pub struct CliTranscriber {
    cli_path: PathBuf,
    model_path: PathBuf,
    language: String,
    threads: usize,
}

/// JSON output structure from whisper-cli
#[derive(Debug, Deserialize)]
struct WhisperCliOutput {
    transcription: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    text: String,
}

impl CliTranscriber {
    /// Create a local transcriber, resolving the binary and model now
    /// so a broken install fails at startup
    pub fn new(config: &TranscribeConfig) -> Result<Self, TranscribeError> {
        let cli_path = resolve_cli_path(config.whisper_cli_path.as_deref())?;

        let model_path = config.local_model.clone().ok_or_else(|| {
            TranscribeError::ConfigError(
                "transcribe.local_model is required for the local backend".into(),
            )
        })?;
        if !model_path.exists() {
            return Err(TranscribeError::ConfigError(format!(
                "model file not found: {:?}",
                model_path
            )));
        }

        // threads = 0 or None means auto-detect
        let threads = match config.threads {
            Some(0) | None => num_cpus::get().min(4),
            Some(n) => n,
        };

        tracing::info!(
            "Using whisper-cli backend: {:?} with model {:?}",
            cli_path,
            model_path
        );

        Ok(Self {
            cli_path,
            model_path,
            language: config.language.clone(),
            threads,
        })
    }

    fn write_temp_wav(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<tempfile::NamedTempFile, TranscribeError> {
        let temp_file = tempfile::Builder::new()
            .prefix("pushtype_")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| {
                TranscribeError::AudioFormat(format!("Failed to create temp file: {}", e))
            })?;

        let wav = super::encode_wav(samples, sample_rate)?;
        std::fs::write(temp_file.path(), wav)
            .map_err(|e| TranscribeError::AudioFormat(format!("Failed to write WAV: {}", e)))?;

        Ok(temp_file)
    }
}

impl Transcriber for CliTranscriber {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, TranscribeError> {
        if samples.is_empty() {
            return Err(TranscribeError::AudioFormat("Empty audio buffer".into()));
        }

        let start = std::time::Instant::now();

        let temp_wav = self.write_temp_wav(samples, sample_rate)?;

        // whisper-cli appends .json to the output base path
        let temp_out = tempfile::Builder::new()
            .prefix("pushtype_out_")
            .tempfile()
            .map_err(|e| {
                TranscribeError::InferenceFailed(format!("Failed to create temp file: {}", e))
            })?;
        let output_base = temp_out
            .path()
            .to_str()
            .ok_or_else(|| TranscribeError::InferenceFailed("Invalid temp path".into()))?;

        let mut cmd = Command::new(&self.cli_path);
        cmd.arg("--model")
            .arg(&self.model_path)
            .arg("--file")
            .arg(temp_wav.path())
            .arg("--output-json")
            .arg("--output-file")
            .arg(output_base)
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg("--no-prints");

        if self.language != "auto" {
            cmd.arg("--language").arg(&self.language);
        }

        tracing::debug!("Running whisper-cli: {:?}", cmd);

        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                TranscribeError::InferenceFailed(format!("Failed to run whisper-cli: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::InferenceFailed(format!(
                "whisper-cli failed: {}",
                stderr
            )));
        }

        let json_path = format!("{}.json", output_base);
        let json_content = std::fs::read_to_string(&json_path).map_err(|e| {
            TranscribeError::InferenceFailed(format!("Failed to read output: {}", e))
        })?;
        let _ = std::fs::remove_file(&json_path);

        let result: WhisperCliOutput = serde_json::from_str(&json_content).map_err(|e| {
            TranscribeError::InferenceFailed(format!("Failed to parse JSON output: {}", e))
        })?;

        let text: String = result
            .transcription
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        tracing::info!(
            "Local transcription completed in {:.2}s ({} chars)",
            start.elapsed().as_secs_f32(),
            text.chars().count()
        );

        Ok(text)
    }
}

/// Resolve the whisper-cli binary: configured path first, then PATH
fn resolve_cli_path(configured: Option<&Path>) -> Result<PathBuf, TranscribeError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(TranscribeError::CliNotFound(format!(
            "configured path {:?} does not exist",
            path
        )));
    }

    for name in ["whisper-cli", "whisper-cpp", "main"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(TranscribeError::CliNotFound(
        "not found in PATH (tried whisper-cli, whisper-cpp, main)".into(),
    ))
}
