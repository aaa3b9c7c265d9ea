//! End-to-end scenarios for the hotkey pipeline, minus real hardware:
//! raw key events through the debouncer and exit gate, and the
//! clipboard-guarded inject/format paths with fake desktop state.

use pushtype::clipboard::Clipboard;
use pushtype::config::{InjectConfig, SupervisorConfig};
use pushtype::debounce::{Debouncer, Trigger};
use pushtype::error::OutputError;
use pushtype::exit_gate::{ExitGate, GateDecision};
use pushtype::hotkey::{KeyEvent, MappedKey};
use pushtype::output::{Chord, Injector, KeySim};
use pushtype::state::stop_deadline;
use pushtype::supervisor::{RestartDecision, RestartPolicy, WorkerExit};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn press(key: MappedKey, at: Instant) -> KeyEvent {
    KeyEvent {
        key,
        pressed: true,
        at,
    }
}

fn release(key: MappedKey, at: Instant) -> KeyEvent {
    KeyEvent {
        key,
        pressed: false,
        at,
    }
}

/// One clipboard, one selection, one text field, shared by the fake
/// clipboard and fake key simulator the way a compositor would share
/// them.
#[derive(Default)]
struct Desktop {
    clipboard: String,
    selection: String,
    typed: Vec<String>,
    fail_chords: bool,
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
        let mut desktop = self.0.lock().unwrap();
        if desktop.fail_chords {
            return Err(OutputError::KeySim("chord failed".into()));
        }
        match chord {
            Chord::Copy => {
                desktop.clipboard = desktop.selection.clone();
            }
            Chord::Paste | Chord::PasteShifted => {
                let text = desktop.clipboard.clone();
                desktop.typed.push(text);
            }
        }
        Ok(())
    }
}

fn injector(desktop: &Arc<Mutex<Desktop>>) -> Injector<FakeClipboard, FakeKeys> {
    let config = InjectConfig {
        settle_ms: 150,
        focus_delay_ms: 100,
    };
    Injector::new(FakeClipboard(desktop.clone()), FakeKeys(desktop.clone()), &config)
}

#[test]
fn record_hotkey_toggles_once_per_cooldown() {
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    let t0 = Instant::now();

    debouncer.on_key_event(press(MappedKey::Alt, t0));
    assert_eq!(
        debouncer.on_key_event(press(MappedKey::Record, t0)),
        Some(Trigger::ToggleRecording)
    );
    debouncer.on_key_event(release(MappedKey::Record, t0 + Duration::from_millis(40)));

    // A nervous double-tap inside the cooldown does not stop the
    // recording it just started
    assert_eq!(
        debouncer.on_key_event(press(MappedKey::Record, t0 + Duration::from_millis(120))),
        None
    );

    // The deliberate stop after the cooldown goes through
    assert_eq!(
        debouncer.on_key_event(press(MappedKey::Record, t0 + Duration::from_millis(600))),
        Some(Trigger::ToggleRecording)
    );
}

#[test]
fn record_key_without_alt_does_nothing() {
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    let t0 = Instant::now();

    assert_eq!(debouncer.on_key_event(press(MappedKey::Record, t0)), None);

    debouncer.on_key_event(press(MappedKey::Alt, t0 + Duration::from_millis(10)));
    debouncer.on_key_event(release(MappedKey::Alt, t0 + Duration::from_millis(20)));
    assert_eq!(
        debouncer.on_key_event(press(MappedKey::Record, t0 + Duration::from_millis(30))),
        None
    );
}

#[test]
fn exit_needs_a_second_press_inside_the_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    let mut gate = ExitGate::new(Duration::from_secs(2));
    let t0 = Instant::now();

    let first = debouncer.on_key_event(press(MappedKey::Exit, t0)).unwrap();
    assert_eq!(first, Trigger::ExitRequested);
    assert_eq!(gate.on_exit_trigger(t0), GateDecision::Armed);

    let t1 = t0 + Duration::from_millis(800);
    let second = debouncer.on_key_event(press(MappedKey::Exit, t1)).unwrap();
    assert_eq!(second, Trigger::ExitRequested);
    assert_eq!(gate.on_exit_trigger(t1), GateDecision::Terminate);
}

#[test]
fn exit_presses_queued_behind_a_busy_loop_do_not_terminate() {
    // While a long transcription blocks the event loop, key events pile
    // up in the channel and are drained back-to-back afterwards. The
    // gate must see their arrival times, not the drain time: two Esc
    // presses 3 s apart stay two independent stray presses.
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    let mut gate = ExitGate::new(Duration::from_secs(2));
    let t0 = Instant::now();

    let queued = vec![
        press(MappedKey::Exit, t0),
        press(MappedKey::Exit, t0 + Duration::from_secs(3)),
    ];

    let mut decisions = Vec::new();
    for event in queued {
        let at = event.at;
        if debouncer.on_key_event(event) == Some(Trigger::ExitRequested) {
            decisions.push(gate.on_exit_trigger(at));
        }
    }

    assert_eq!(decisions, vec![GateDecision::Armed, GateDecision::Armed]);
}

#[test]
fn toggles_queued_behind_a_busy_loop_keep_their_spacing() {
    // Same drain pattern for the debouncer: two deliberate toggles a
    // second apart must both fire even when processed microseconds
    // apart.
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    let t0 = Instant::now();

    let queued = vec![
        press(MappedKey::Alt, t0),
        press(MappedKey::Record, t0),
        press(MappedKey::Record, t0 + Duration::from_secs(1)),
    ];

    let fired: Vec<_> = queued
        .into_iter()
        .filter_map(|e| debouncer.on_key_event(e))
        .collect();

    assert_eq!(
        fired,
        vec![Trigger::ToggleRecording, Trigger::ToggleRecording]
    );
}

#[test]
fn stale_exit_press_rearms_instead_of_terminating() {
    let mut gate = ExitGate::new(Duration::from_secs(2));
    let t0 = Instant::now();

    assert_eq!(gate.on_exit_trigger(t0), GateDecision::Armed);
    // Second press arrives 5 seconds later; the window is long gone
    let t1 = t0 + Duration::from_secs(5);
    assert_eq!(gate.on_exit_trigger(t1), GateDecision::Armed);
    // But a prompt follow-up now terminates
    let t2 = t1 + Duration::from_millis(500);
    assert_eq!(gate.on_exit_trigger(t2), GateDecision::Terminate);
}

#[tokio::test(start_paused = true)]
async fn dictation_paste_leaves_clipboard_untouched() {
    let desktop = Arc::new(Mutex::new(Desktop {
        clipboard: "user's precious link".to_string(),
        ..Default::default()
    }));

    injector(&desktop).inject("hello   world\n").await.unwrap();

    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.typed, vec!["hello world"]);
    assert_eq!(desktop.clipboard, "user's precious link");
}

#[tokio::test(start_paused = true)]
async fn format_roundtrip_replaces_selection_and_restores_clipboard() {
    let desktop = Arc::new(Mutex::new(Desktop {
        clipboard: "saved".to_string(),
        selection: "teh quick brwn fox".to_string(),
        ..Default::default()
    }));
    let injector = injector(&desktop);

    let selection = injector.capture_selection().await.unwrap();
    assert_eq!(selection, "teh quick brwn fox");

    injector
        .replace_selection("The quick brown fox.")
        .await
        .unwrap();

    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.typed, vec!["The quick brown fox."]);
    assert_eq!(desktop.clipboard, "saved");
}

#[tokio::test(start_paused = true)]
async fn clipboard_restored_even_when_the_paste_chord_fails() {
    let desktop = Arc::new(Mutex::new(Desktop {
        clipboard: "saved".to_string(),
        fail_chords: true,
        ..Default::default()
    }));

    let result = injector(&desktop).inject("some transcript").await;
    assert!(result.is_err());
    assert_eq!(desktop.lock().unwrap().clipboard, "saved");
}

#[test]
fn stop_deadline_scales_with_recording_length() {
    assert_eq!(stop_deadline(Duration::from_secs(10)), Duration::from_secs(40));
    assert_eq!(stop_deadline(Duration::from_secs(90)), Duration::from_secs(50));
    assert_eq!(stop_deadline(Duration::from_secs(600)), Duration::from_secs(130));
}

#[test]
fn crashing_worker_gets_a_bounded_number_of_restarts() {
    let policy = RestartPolicy::new(&SupervisorConfig {
        enabled: true,
        max_attempts: 5,
        base_delay_ms: 500,
        max_delay_ms: 30_000,
    });

    let mut delays = Vec::new();
    let mut attempt = 1;
    let exhausted = loop {
        match policy.decide(WorkerExit::Crashed, attempt) {
            RestartDecision::RestartAfter(delay) => {
                delays.push(delay);
                attempt += 1;
            }
            RestartDecision::GiveUp => break attempt,
            RestartDecision::Stop => panic!("crash must not stop silently"),
        }
    };

    assert_eq!(exhausted, 5);
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000),
        ]
    );
}
