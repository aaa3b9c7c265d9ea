//! Raw hotkey event stream
//!
//! On Linux, key events come from evdev at the kernel level, which
//! works on all Wayland compositors because it bypasses the display
//! server. Requires the user to be in the 'input' group.
//!
//! The listener only maps the keys the application cares about (Alt,
//! the record key, the format key, the exit key) and forwards raw
//! press/release pairs; debouncing and modifier logic live in
//! [`crate::debounce`] on the receiving side, so the listener thread
//! never runs handler logic.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use std::time::Instant;
use tokio::sync::mpsc;

/// Keys the application reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedKey {
    /// Either Alt key (modifier for record/format triggers)
    Alt,
    /// The configured record key
    Record,
    /// The configured format key
    Format,
    /// The configured exit key
    Exit,
}

/// A raw key transition for one of the mapped keys.
///
/// `at` is stamped on the listener thread when the event arrives, so
/// cooldown and confirmation windows measure real inter-arrival time
/// even when the receiving loop falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: MappedKey,
    pub pressed: bool,
    pub at: Instant,
}

/// Trait for key listener implementations
#[async_trait::async_trait]
pub trait KeyListener: Send + Sync {
    /// Start listening; returns a channel receiver for mapped events
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the platform key listener
#[cfg(target_os = "linux")]
pub fn create_listener(config: &HotkeyConfig) -> Result<Box<dyn KeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(config)?))
}
