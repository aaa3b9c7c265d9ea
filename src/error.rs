//! Error types for pushtype
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the pushtype application
#[derive(Error, Debug)]
pub enum PushtypeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Text formatting error: {0}")]
    Format(#[from] FormatError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'. List devices with: pushtype list-devices")]
    DeviceNotFound(String),

    #[error("Capture thread did not stop within {0:?}, recording abandoned")]
    StopTimeout(std::time::Duration),

    #[error("No audio was captured. Check your microphone.")]
    EmptyRecording,

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors related to speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("OPENAI_API_KEY not set. Export it or add it to your environment.")]
    MissingApiKey,

    #[error("whisper-cli not found: {0}\n  Install whisper.cpp or set transcribe.whisper_cli_path in config.")]
    CliNotFound(String),

    #[error("Transcription failed: {0}")]
    InferenceFailed(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Remote server error: {0}")]
    RemoteError(String),
}

/// Errors related to clipboard access and text injection
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("wl-copy not found in PATH. Install wl-clipboard via your package manager.")]
    WlCopyNotFound,

    #[error("wl-paste not found in PATH. Install wl-clipboard via your package manager.")]
    WlPasteNotFound,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool")]
    YdotoolNotRunning,

    #[error("Clipboard read failed: {0}")]
    ClipboardRead(String),

    #[error("Clipboard write failed: {0}")]
    ClipboardWrite(String),

    #[error("Key simulation failed: {0}")]
    KeySim(String),

    #[error("Text injection failed: {0}")]
    InjectionFailed(String),
}

/// Errors from the text-formatting worker
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("No text selected. Highlight some text first.")]
    EmptySelection,

    #[error("Cannot connect to the LLM endpoint at {0}. Is the server running?")]
    Connection(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("Clipboard error during formatting: {0}")]
    Output(#[from] OutputError),
}

/// Errors from the format-worker supervisor
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn format worker: {0}")]
    Spawn(String),

    #[error("Format worker crashed {0} times, giving up")]
    AttemptsExhausted(u32),
}

/// Result type alias using PushtypeError
pub type Result<T> = std::result::Result<T, PushtypeError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}
