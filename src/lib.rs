//! Pushtype: push-to-talk dictation with an AI text-fixing sidekick
//!
//! Two hotkeys drive everything. Alt+R toggles a recording session:
//! microphone capture, speech-to-text, and a paste of the transcript at
//! the cursor. Alt+G sends the highlighted text through a local LLM and
//! pastes the cleaned-up version back over the selection. Both sides
//! restore the user's clipboard afterwards.
//!
//! The formatting hotkey runs in a separate worker process supervised
//! by the daemon, so an LLM hang never blocks dictation.

pub mod audio;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod debounce;
pub mod error;
pub mod exit_gate;
pub mod format;
pub mod hotkey;
pub mod indicator;
pub mod lock;
pub mod output;
pub mod state;
pub mod supervisor;
pub mod text;
pub mod transcribe;

pub use config::Config;
pub use error::{PushtypeError, Result};
