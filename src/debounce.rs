//! Hotkey debouncer
//!
//! Converts the raw key event stream from the listener into logical
//! triggers. Tracks the Alt modifier across press/release pairs and
//! suppresses duplicate activations of the same trigger inside a
//! per-trigger cooldown window, so a key bounce or an over-eager
//! keyboard repeat produces exactly one logical event.
//!
//! The debouncer is pure state: it never blocks and never invokes
//! handlers itself. Time comes from the event's arrival stamp, so a
//! receiving loop that falls behind cannot collapse the inter-arrival
//! times the cooldown is measured against.

use crate::hotkey::{KeyEvent, MappedKey};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A deduplicated, semantically meaningful user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Start or stop a recording session (Alt+record key)
    ToggleRecording,
    /// Reformat the highlighted text (Alt+format key)
    FormatSelection,
    /// Request exit (bare exit key; gated by the exit confirmation)
    ExitRequested,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::ToggleRecording => write!(f, "toggle-recording"),
            Trigger::FormatSelection => write!(f, "format-selection"),
            Trigger::ExitRequested => write!(f, "exit-requested"),
        }
    }
}

/// Per-trigger debouncing over the raw key stream
pub struct Debouncer {
    cooldown: Duration,
    alt_pressed: bool,
    last_fired: HashMap<Trigger, Instant>,
}

impl Debouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            alt_pressed: false,
            last_fired: HashMap::new(),
        }
    }

    /// Feed one raw key event; returns the logical trigger it produces,
    /// if any. Cooldown is evaluated per trigger kind against the
    /// event's arrival time, so recording toggles and format triggers
    /// never block each other.
    pub fn on_key_event(&mut self, event: KeyEvent) -> Option<Trigger> {
        match (event.key, event.pressed) {
            (MappedKey::Alt, pressed) => {
                self.alt_pressed = pressed;
                None
            }
            (MappedKey::Record, true) if self.alt_pressed => {
                self.fire(Trigger::ToggleRecording, event.at)
            }
            (MappedKey::Format, true) if self.alt_pressed => {
                self.fire(Trigger::FormatSelection, event.at)
            }
            (MappedKey::Exit, true) => self.fire(Trigger::ExitRequested, event.at),
            _ => None,
        }
    }

    fn fire(&mut self, trigger: Trigger, now: Instant) -> Option<Trigger> {
        if let Some(last) = self.last_fired.get(&trigger) {
            if now.duration_since(*last) < self.cooldown {
                tracing::trace!("Suppressed duplicate {} trigger", trigger);
                return None;
            }
        }
        self.last_fired.insert(trigger, now);
        Some(trigger)
    }
}
