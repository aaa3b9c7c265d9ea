//! Clipboard-based text output
//!
//! All three text operations the app performs at the cursor go through
//! the clipboard guard in [`crate::clipboard`]:
//! - dictation injection: copy the transcript, Ctrl+Shift+V
//! - selection capture: clear clipboard, Ctrl+C, read it back
//! - selection replacement: copy the new text, Ctrl+V
//!
//! Ctrl+Shift+V is used for injection so dictating into a terminal
//! works; plain Ctrl+V is used for replacement to match how selections
//! behave in editors and browsers.

pub mod keysim;

use crate::clipboard::{run_guarded, Clipboard};
use crate::config::InjectConfig;
use crate::error::OutputError;
use crate::text;
use std::time::Duration;

pub use keysim::{Chord, KeySim, YdotoolKeySim};

/// Clipboard + chord text injection
pub struct Injector<C: Clipboard, K: KeySim> {
    clipboard: C,
    keys: K,
    /// Paste-to-restore settle delay (best-effort, see config docs)
    settle: Duration,
    /// Copy-to-chord focus delay
    focus_delay: Duration,
}

impl<C: Clipboard, K: KeySim> Injector<C, K> {
    pub fn new(clipboard: C, keys: K, config: &InjectConfig) -> Self {
        Self {
            clipboard,
            keys,
            settle: Duration::from_millis(config.settle_ms),
            focus_delay: Duration::from_millis(config.focus_delay_ms),
        }
    }

    /// Paste `transcript` at the cursor as continuous text, leaving the
    /// user's clipboard as it was.
    pub async fn inject(&self, transcript: &str) -> Result<(), OutputError> {
        let normalized = text::continuous(transcript);
        if normalized.is_empty() {
            tracing::debug!("Nothing to inject after normalization");
            return Ok(());
        }

        run_guarded(&self.clipboard, self.settle, || async {
            self.clipboard.write(&normalized).await?;
            tokio::time::sleep(self.focus_delay).await;
            self.keys.send_chord(Chord::PasteShifted).await
        })
        .await?;

        tracing::info!("Injected {} chars at cursor", normalized.chars().count());
        Ok(())
    }

    /// Read the currently highlighted text via a guarded Ctrl+C.
    /// Returns an empty string when nothing is selected.
    pub async fn capture_selection(&self) -> Result<String, OutputError> {
        run_guarded(&self.clipboard, self.settle, || async {
            // Clear first so a stale clipboard is not mistaken for a selection
            self.clipboard.write("").await?;
            self.keys.send_chord(Chord::Copy).await?;
            tokio::time::sleep(self.focus_delay).await;
            self.clipboard.read().await
        })
        .await
    }

    /// Replace the current selection with `replacement` via a guarded
    /// copy + Ctrl+V.
    pub async fn replace_selection(&self, replacement: &str) -> Result<(), OutputError> {
        if replacement.is_empty() {
            return Ok(());
        }

        run_guarded(&self.clipboard, self.settle, || async {
            self.clipboard.write(replacement).await?;
            tokio::time::sleep(self.focus_delay).await;
            self.keys.send_chord(Chord::Paste).await
        })
        .await?;

        tracing::info!("Replaced selection ({} chars)", replacement.chars().count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared model of a desktop: one clipboard, a focused text field,
    /// and a current selection. The key sim reads and writes it the way
    /// the compositor would.
    #[derive(Default)]
    struct Desktop {
        clipboard: String,
        selection: String,
        typed: Vec<String>,
    }

    #[derive(Clone)]
    struct FakeClipboard(Arc<Mutex<Desktop>>);

    #[async_trait::async_trait]
    impl Clipboard for FakeClipboard {
        async fn read(&self) -> Result<String, OutputError> {
            Ok(self.0.lock().unwrap().clipboard.clone())
        }

        async fn write(&self, text: &str) -> Result<(), OutputError> {
            self.0.lock().unwrap().clipboard = text.to_string();
            Ok(())
        }
    }

    #[derive(Clone)]
    struct FakeKeys(Arc<Mutex<Desktop>>);

    #[async_trait::async_trait]
    impl KeySim for FakeKeys {
        async fn send_chord(&self, chord: Chord) -> Result<(), OutputError> {
            let mut desk = self.0.lock().unwrap();
            match chord {
                Chord::Copy => {
                    let sel = desk.selection.clone();
                    desk.clipboard = sel;
                }
                Chord::Paste | Chord::PasteShifted => {
                    let content = desk.clipboard.clone();
                    desk.typed.push(content);
                }
            }
            Ok(())
        }
    }

    fn injector(desk: &Arc<Mutex<Desktop>>) -> Injector<FakeClipboard, FakeKeys> {
        Injector::new(
            FakeClipboard(desk.clone()),
            FakeKeys(desk.clone()),
            &InjectConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn inject_pastes_normalized_text_and_restores_clipboard() {
        let desk = Arc::new(Mutex::new(Desktop {
            clipboard: "hello".to_string(),
            ..Default::default()
        }));
        let inj = injector(&desk);

        inj.inject("world\nagain").await.unwrap();

        let desk = desk.lock().unwrap();
        assert_eq!(desk.typed, vec!["world again"]);
        assert_eq!(desk.clipboard, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn inject_empty_transcript_is_a_noop() {
        let desk = Arc::new(Mutex::new(Desktop {
            clipboard: "keep".to_string(),
            ..Default::default()
        }));
        let inj = injector(&desk);

        inj.inject("\n  \n").await.unwrap();

        let desk = desk.lock().unwrap();
        assert!(desk.typed.is_empty());
        assert_eq!(desk.clipboard, "keep");
    }

    #[tokio::test(start_paused = true)]
    async fn capture_selection_returns_highlight_and_restores() {
        let desk = Arc::new(Mutex::new(Desktop {
            clipboard: "old clip".to_string(),
            selection: "highlighted words".to_string(),
            ..Default::default()
        }));
        let inj = injector(&desk);

        let captured = inj.capture_selection().await.unwrap();
        assert_eq!(captured, "highlighted words");
        assert_eq!(desk.lock().unwrap().clipboard, "old clip");
    }

    #[tokio::test(start_paused = true)]
    async fn capture_with_no_selection_is_empty() {
        let desk = Arc::new(Mutex::new(Desktop {
            clipboard: "old clip".to_string(),
            selection: String::new(),
            ..Default::default()
        }));
        let inj = injector(&desk);

        let captured = inj.capture_selection().await.unwrap();
        assert!(captured.is_empty());
        assert_eq!(desk.lock().unwrap().clipboard, "old clip");
    }

    #[tokio::test(start_paused = true)]
    async fn replace_selection_pastes_and_restores() {
        let desk = Arc::new(Mutex::new(Desktop {
            clipboard: "prior".to_string(),
            ..Default::default()
        }));
        let inj = injector(&desk);

        inj.replace_selection("fixed text").await.unwrap();

        let desk = desk.lock().unwrap();
        assert_eq!(desk.typed, vec!["fixed text"]);
        assert_eq!(desk.clipboard, "prior");
    }
}
