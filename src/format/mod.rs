//! Text-formatting worker
//!
//! Runs as its own process (spawned and supervised by the daemon) so a
//! hung or crashing LLM request can never wedge dictation. The worker
//! has its own hotkey listener, debouncer, and exit gate; it reacts to
//! the format trigger and ignores recording entirely. One format
//! request runs at a time; triggers arriving while one is in flight
//! are dropped with a notice.

pub mod llm;

use crate::clipboard::{Clipboard, WlClipboard};
use crate::config::Config;
use crate::debounce::{Debouncer, Trigger};
use crate::error::{FormatError, Result};
use crate::exit_gate::{ExitGate, GateDecision};
use crate::hotkey::create_listener;
use crate::output::{Injector, KeySim, YdotoolKeySim};
use llm::LlmFormatter;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

/// A text reformatting backend. Blocking; callers run it off the event
/// loop via spawn_blocking.
pub trait TextFormatter: Send + Sync {
    fn format(&self, text: &str) -> std::result::Result<String, FormatError>;
}

/// Run the worker event loop until double-exit or a signal.
pub async fn run_worker(config: &Config) -> Result<()> {
    let injector = Arc::new(Injector::new(WlClipboard, YdotoolKeySim, &config.inject));
    let formatter: Arc<dyn TextFormatter> = Arc::new(LlmFormatter::new(&config.format));

    let mut listener = create_listener(&config.hotkey)?;
    let mut events = listener.start().await?;

    let mut debouncer = Debouncer::new(Duration::from_millis(config.hotkey.cooldown_ms));
    let mut gate = ExitGate::new(Duration::from_millis(config.exit.confirm_timeout_ms));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut in_flight: Option<tokio::task::JoinHandle<()>> = None;

    tracing::info!(
        "Format worker started. Alt+{} formats the selection.",
        config.hotkey.format_key
    );

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                // Arrival stamp, not processing time (see daemon.rs)
                let at = event.at;
                match debouncer.on_key_event(event) {
                    Some(Trigger::FormatSelection) => {
                        let busy = in_flight
                            .as_ref()
                            .map(|task| !task.is_finished())
                            .unwrap_or(false);
                        if busy {
                            tracing::warn!("Still processing the previous request, ignoring");
                            continue;
                        }
                        let injector = Arc::clone(&injector);
                        let formatter = Arc::clone(&formatter);
                        in_flight = Some(tokio::spawn(async move {
                            if let Err(e) = format_selection(&*injector, &formatter).await {
                                tracing::error!("Formatting failed: {}", e);
                            }
                        }));
                    }
                    Some(Trigger::ExitRequested) => match gate.on_exit_trigger(at) {
                        GateDecision::Armed => {
                            tracing::info!("Press {} again to exit", config.hotkey.exit_key);
                        }
                        GateDecision::Terminate => break,
                    },
                    // Recording belongs to the daemon process
                    Some(Trigger::ToggleRecording) | None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
                break;
            }
        }
    }

    // Give an in-flight request a moment to restore the clipboard
    if let Some(task) = in_flight {
        if !task.is_finished() {
            tracing::info!("Waiting for the current format request to finish");
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                tracing::warn!("Format request still running, exiting anyway");
            }
        }
    }

    listener.stop().await?;
    tracing::info!("Format worker stopped");
    Ok(())
}

/// Capture the highlighted text, run it through the formatter, and
/// paste the result over the selection. The user's clipboard survives
/// the trip.
async fn format_selection<C, K>(
    injector: &Injector<C, K>,
    formatter: &Arc<dyn TextFormatter>,
) -> std::result::Result<(), FormatError>
where
    C: Clipboard,
    K: KeySim,
{
    let selection = injector.capture_selection().await?;
    let selection = selection.trim().to_string();
    if selection.is_empty() {
        return Err(FormatError::EmptySelection);
    }

    tracing::info!("Formatting {} chars of selected text", selection.chars().count());

    // The HTTP client is blocking; keep the event loop free while the
    // response streams
    let formatter = Arc::clone(formatter);
    let formatted = tokio::task::spawn_blocking(move || formatter.format(&selection))
        .await
        .map_err(|e| FormatError::Api(format!("formatting task panicked: {}", e)))??;

    if formatted.is_empty() {
        tracing::warn!("Formatter returned empty text, leaving selection untouched");
        return Ok(());
    }

    injector.replace_selection(&formatted).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectConfig;
    use crate::error::OutputError;
    use crate::output::Chord;
    use std::sync::Mutex;

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
        async fn read(&self) -> std::result::Result<String, OutputError> {
            Ok(self.0.lock().unwrap().clipboard.clone())
        }

        async fn write(&self, text: &str) -> std::result::Result<(), OutputError> {
            self.0.lock().unwrap().clipboard = text.to_string();
            Ok(())
        }
    }

    #[derive(Clone)]
    struct FakeKeys(Arc<Mutex<Desktop>>);

    #[async_trait::async_trait]
    impl KeySim for FakeKeys {
        async fn send_chord(&self, chord: Chord) -> std::result::Result<(), OutputError> {
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

    struct UppercaseFormatter;

    impl TextFormatter for UppercaseFormatter {
        fn format(&self, text: &str) -> std::result::Result<String, FormatError> {
            Ok(text.to_uppercase())
        }
    }

    fn setup(desktop: Desktop) -> (Arc<Mutex<Desktop>>, Injector<FakeClipboard, FakeKeys>) {
        let desk = Arc::new(Mutex::new(desktop));
        let injector = Injector::new(
            FakeClipboard(desk.clone()),
            FakeKeys(desk.clone()),
            &InjectConfig::default(),
        );
        (desk, injector)
    }

    #[tokio::test(start_paused = true)]
    async fn formats_selection_in_place() {
        let (desk, injector) = setup(Desktop {
            clipboard: "saved".to_string(),
            selection: "fix this".to_string(),
            ..Default::default()
        });
        let formatter: Arc<dyn TextFormatter> = Arc::new(UppercaseFormatter);

        format_selection(&injector, &formatter).await.unwrap();

        let desk = desk.lock().unwrap();
        assert_eq!(desk.typed, vec!["FIX THIS"]);
        assert_eq!(desk.clipboard, "saved");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_selection_is_an_error_and_types_nothing() {
        let (desk, injector) = setup(Desktop {
            clipboard: "saved".to_string(),
            selection: String::new(),
            ..Default::default()
        });
        let formatter: Arc<dyn TextFormatter> = Arc::new(UppercaseFormatter);

        let result = format_selection(&injector, &formatter).await;
        assert!(matches!(result, Err(FormatError::EmptySelection)));

        let desk = desk.lock().unwrap();
        assert!(desk.typed.is_empty());
        assert_eq!(desk.clipboard, "saved");
    }
}
