//! Keyboard chord simulation
//!
//! Uses ydotool to inject copy/paste chords at the uinput level, which
//! works on Wayland and X11 alike. Key codes are Linux input event
//! codes (KEY_LEFTCTRL=29, KEY_LEFTSHIFT=42, KEY_C=46, KEY_V=47).

use crate::error::OutputError;
use std::process::Stdio;
use tokio::process::Command;

/// Chords the core needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chord {
    /// Ctrl+C: copy the current selection
    Copy,
    /// Ctrl+V: paste (used to replace a selection)
    Paste,
    /// Ctrl+Shift+V: paste variant that terminals accept
    PasteShifted,
}

/// Keyboard chord injection
#[async_trait::async_trait]
pub trait KeySim: Send + Sync {
    async fn send_chord(&self, chord: Chord) -> Result<(), OutputError>;
}

/// ydotool-backed chord injection
pub struct YdotoolKeySim;

impl YdotoolKeySim {
    fn chord_args(chord: Chord) -> &'static [&'static str] {
        match chord {
            Chord::Copy => &["key", "29:1", "46:1", "46:0", "29:0"],
            Chord::Paste => &["key", "29:1", "47:1", "47:0", "29:0"],
            Chord::PasteShifted => &["key", "29:1", "42:1", "47:1", "47:0", "42:0", "29:0"],
        }
    }
}

#[async_trait::async_trait]
impl KeySim for YdotoolKeySim {
    async fn send_chord(&self, chord: Chord) -> Result<(), OutputError> {
        let output = Command::new("ydotool")
            .args(Self::chord_args(chord))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::KeySim(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(OutputError::YdotoolNotRunning);
            }
            return Err(OutputError::KeySim(stderr.into_owned()));
        }

        Ok(())
    }
}
