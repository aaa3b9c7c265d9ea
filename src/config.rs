//! Configuration loading and types for pushtype
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/pushtype/config.toml)
//! 3. CLI arguments (highest priority)

use crate::error::PushtypeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Pushtype Configuration
#
# Location: ~/.config/pushtype/config.toml
# All settings can be overridden via CLI flags

[hotkey]
# Key pressed together with Alt to start/stop recording
record_key = "R"

# Key pressed together with Alt to reformat the highlighted text
# (handled by the format worker process)
format_key = "G"

# Key that requests exit; must be pressed twice within the
# confirmation window to actually terminate
exit_key = "ESC"

# Minimum time between accepted activations of the same trigger
cooldown_ms = 500

[exit]
# Window after the first exit press during which a second press terminates
confirm_timeout_ms = 2000

[audio]
# Audio input device ("default" uses system default)
# List devices with: pushtype list-devices
device = "default"

# Sample rate in Hz (whisper expects 16000)
sample_rate = 16000

[transcribe]
# Backend: "remote" (OpenAI Whisper API) or "local" (whisper-cli subprocess)
backend = "remote"

# Remote model name and endpoint
model = "whisper-1"
endpoint = "https://api.openai.com/v1/audio/transcriptions"

# Language for transcription ("auto" for auto-detection)
language = "en"

# Local backend: path to a ggml model file for whisper-cli
# local_model = "/usr/share/whisper/ggml-base.en.bin"

# Local backend: path to the whisper-cli binary (default: search PATH)
# whisper_cli_path = "/usr/local/bin/whisper-cli"

# Local backend: inference threads (omit for auto-detection)
# threads = 4

[inject]
# Delay between the paste chord and clipboard restoration, giving the
# target application time to read the clipboard. Best-effort mitigation,
# not a guarantee; raise it if pastes come out as the old clipboard.
settle_ms = 150

# Delay between copying to the clipboard and sending the paste chord
focus_delay_ms = 100

[format]
# OpenAI-compatible chat completions endpoint (LM Studio default)
endpoint = "http://127.0.0.1:1234/v1/chat/completions"

# Model name sent to the endpoint
model = "google/gemma-3n-e4b"

temperature = 0.3

[indicator]
# Command to run while recording (shown on start, terminated on stop).
# Leave empty to disable.
command = ""

[supervisor]
# Run and supervise the format worker from the daemon
enabled = true

# Maximum worker launches before giving up on crashes
max_attempts = 5

# Base restart delay; doubles per attempt, capped at max_delay_ms
base_delay_ms = 500
max_delay_ms = 30000
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub exit: ExitConfig,
    pub audio: AudioConfig,
    pub transcribe: TranscribeConfig,
    pub inject: InjectConfig,
    pub format: FormatConfig,
    pub indicator: IndicatorConfig,
    pub supervisor: SupervisorConfig,
}

/// Hotkey bindings and debounce settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Key combined with Alt to toggle recording
    pub record_key: String,
    /// Key combined with Alt to trigger reformatting
    pub format_key: String,
    /// Exit key (double-press required)
    pub exit_key: String,
    /// Per-trigger cooldown in milliseconds
    pub cooldown_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            record_key: "R".to_string(),
            format_key: "G".to_string(),
            exit_key: "ESC".to_string(),
            cooldown_ms: 500,
        }
    }
}

/// Exit confirmation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Arming window for the second exit press, in milliseconds
    pub confirm_timeout_ms: u64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: 2000,
        }
    }
}

/// Audio capture settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name ("default" for system default)
    pub device: String,
    /// Target sample rate in Hz
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 16000,
        }
    }
}

/// Transcription backend selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscribeBackend {
    /// OpenAI Whisper API
    #[default]
    Remote,
    /// whisper-cli subprocess
    Local,
}

/// Transcription settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscribeConfig {
    pub backend: TranscribeBackend,
    /// Remote model name
    pub model: String,
    /// Remote endpoint URL
    pub endpoint: String,
    /// Language code, or "auto"
    pub language: String,
    /// Path to a ggml model for the local backend
    pub local_model: Option<PathBuf>,
    /// Path to whisper-cli (default: search PATH)
    pub whisper_cli_path: Option<PathBuf>,
    /// Inference threads for the local backend (None = auto)
    pub threads: Option<usize>,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            backend: TranscribeBackend::Remote,
            model: "whisper-1".to_string(),
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            language: "en".to_string(),
            local_model: None,
            whisper_cli_path: None,
            threads: None,
        }
    }
}

/// Text injection timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectConfig {
    /// Paste-to-restore settle delay in milliseconds
    pub settle_ms: u64,
    /// Copy-to-paste focus delay in milliseconds
    pub focus_delay_ms: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            settle_ms: 150,
            focus_delay_ms: 100,
        }
    }
}

/// LLM formatting settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    /// Model name sent to the endpoint
    pub model: String,
    pub temperature: f32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:1234/v1/chat/completions".to_string(),
            model: "google/gemma-3n-e4b".to_string(),
            temperature: 0.3,
        }
    }
}

/// Recording indicator subprocess
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Command to spawn while recording; empty disables the indicator
    pub command: String,
}

/// Format-worker restart policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub enabled: bool,
    /// Maximum worker launches before giving up on crashes
    pub max_attempts: u32,
    /// Base restart delay in milliseconds (doubles per attempt)
    pub base_delay_ms: u64,
    /// Restart delay cap in milliseconds
    pub max_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30000,
        }
    }
}

impl Config {
    /// Load configuration from the given path, or the default location.
    /// A missing file yields the built-in defaults.
    pub fn load(path: Option<&PathBuf>) -> Result<Self, PushtypeError> {
        let path = match path {
            Some(p) => p.clone(),
            None => Self::default_path(),
        };

        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| PushtypeError::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| PushtypeError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Default config file location (~/.config/pushtype/config.toml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pushtype")
            .join("config.toml")
    }

    /// Runtime directory for lock and pid files
    /// ($XDG_RUNTIME_DIR/pushtype, falling back to /tmp/pushtype-$UID)
    pub fn runtime_dir() -> PathBuf {
        match std::env::var("XDG_RUNTIME_DIR") {
            Ok(dir) => PathBuf::from(dir).join("pushtype"),
            Err(_) => {
                let uid = unsafe { libc::getuid() };
                PathBuf::from(format!("/tmp/pushtype-{}", uid))
            }
        }
    }

    /// Create the runtime directory if needed
    pub fn ensure_directories() -> std::io::Result<()> {
        std::fs::create_dir_all(Self::runtime_dir())
    }

    /// Write the default config file if none exists, returning its path
    pub fn write_default_if_missing() -> Result<PathBuf, PushtypeError> {
        let path = Self::default_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG)?;
            tracing::info!("Wrote default config to {:?}", path);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_string_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).expect("default config must parse");
        assert_eq!(config.hotkey.record_key, "R");
        assert_eq!(config.hotkey.cooldown_ms, 500);
        assert_eq!(config.exit.confirm_timeout_ms, 2000);
        assert_eq!(config.supervisor.max_attempts, 5);
        assert_eq!(config.transcribe.backend, TranscribeBackend::Remote);
    }

    #[test]
    fn defaults_match_default_config_string() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).expect("parse");
        let built = Config::default();
        assert_eq!(parsed.hotkey.cooldown_ms, built.hotkey.cooldown_ms);
        assert_eq!(parsed.inject.settle_ms, built.inject.settle_ms);
        assert_eq!(parsed.supervisor.base_delay_ms, built.supervisor.base_delay_ms);
        assert_eq!(parsed.format.endpoint, built.format.endpoint);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[hotkey]\nrecord_key = \"T\"\n").expect("parse");
        assert_eq!(config.hotkey.record_key, "T");
        assert_eq!(config.hotkey.cooldown_ms, 500);
        assert_eq!(config.audio.device, "default");
    }
}
