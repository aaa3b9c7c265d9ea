//! Speech-to-text transcription backends
//!
//! The recording session treats transcription as a synchronous call
//! that either returns text or fails; retries, if any, are the
//! backend's own business. Two backends are provided:
//! - remote: OpenAI Whisper API (default)
//! - local: whisper-cli subprocess (whisper.cpp), selected with --local

pub mod cli;
pub mod remote;

use crate::config::{TranscribeBackend, TranscribeConfig};
use crate::error::TranscribeError;

/// A speech-to-text backend. Blocking; callers run it off the event
/// loop via spawn_blocking.
pub trait Transcriber: Send + Sync {
    /// Transcribe mono f32 samples at the given rate
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, TranscribeError>;
}

/// Build the configured transcriber. Configuration problems (missing
/// API key, missing whisper-cli) surface here at startup, not mid-session.
pub fn create_transcriber(
    config: &TranscribeConfig,
) -> Result<Box<dyn Transcriber>, TranscribeError> {
    match config.backend {
        TranscribeBackend::Remote => Ok(Box::new(remote::RemoteTranscriber::new(config)?)),
        TranscribeBackend::Local => Ok(Box::new(cli::CliTranscriber::new(config)?)),
    }
}

/// Encode mono f32 samples as a 16-bit PCM WAV byte buffer
pub(crate) fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, TranscribeError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut buffer, spec)
        .map_err(|e| TranscribeError::AudioFormat(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let scaled = (clamped * i16::MAX as f32) as i16;
        writer
            .write_sample(scaled)
            .map_err(|e| TranscribeError::AudioFormat(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| TranscribeError::AudioFormat(format!("Failed to finalize WAV: {}", e)))?;

    Ok(buffer.into_inner())
}
