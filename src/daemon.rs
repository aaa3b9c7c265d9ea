//! Dictation daemon event loop
//!
//! Owns the hotkey stream, the recording session state machine, the
//! recording indicator, and (when enabled) the format-worker
//! supervisor. One iteration of the loop handles one trigger; the
//! stop-transcribe-inject pipeline for a finished recording runs
//! inline, so a second toggle that arrives meanwhile just queues.

use crate::audio::CaptureHandle;
use crate::clipboard::WlClipboard;
use crate::config::Config;
use crate::debounce::{Debouncer, Trigger};
use crate::error::Result;
use crate::exit_gate::{ExitGate, GateDecision};
use crate::hotkey::create_listener;
use crate::indicator::Indicator;
use crate::output::{Injector, YdotoolKeySim};
use crate::state::RecordingSession;
use crate::supervisor;
use crate::transcribe::{create_transcriber, Transcriber};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

/// Recordings shorter than this are treated as accidental taps
const MIN_RECORDING: Duration = Duration::from_millis(300);

pub async fn run(config: Config, config_path: Option<std::path::PathBuf>) -> Result<()> {
    let transcriber: Arc<dyn Transcriber> = Arc::from(create_transcriber(&config.transcribe)?);
    let injector = Injector::new(WlClipboard, YdotoolKeySim, &config.inject);
    let mut indicator = Indicator::new(&config.indicator);
    let mut session = RecordingSession::new();

    let mut listener = create_listener(&config.hotkey)?;
    let mut events = listener.start().await?;

    let mut debouncer = Debouncer::new(Duration::from_millis(config.hotkey.cooldown_ms));
    let mut gate = ExitGate::new(Duration::from_millis(config.exit.confirm_timeout_ms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_task = if config.supervisor.enabled {
        let sup_config = config.supervisor.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = supervisor::supervise(&sup_config, config_path, shutdown_rx).await {
                tracing::error!("Supervisor stopped: {}", e);
            }
        }))
    } else {
        None
    };

    let mut sigterm = signal(SignalKind::terminate())?;

    tracing::info!(
        "pushtype daemon started. Alt+{} toggles recording, double-{} exits.",
        config.hotkey.record_key,
        config.hotkey.exit_key
    );

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                // The arrival stamp, not the processing time: events can
                // sit in the channel while a pipeline runs, and the gate
                // and debouncer measure real inter-arrival intervals
                let at = event.at;
                match debouncer.on_key_event(event) {
                    Some(Trigger::ToggleRecording) => {
                        handle_toggle(&config, &mut session, &mut indicator, &transcriber, &injector).await;
                    }
                    Some(Trigger::FormatSelection) => {
                        // Handled by the format worker process
                        tracing::trace!("Format trigger (worker's job), ignoring");
                    }
                    Some(Trigger::ExitRequested) => match gate.on_exit_trigger(at) {
                        GateDecision::Armed => {
                            tracing::info!("Press {} again to exit", config.hotkey.exit_key);
                        }
                        GateDecision::Terminate => break,
                    },
                    None => {}
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

    // Abandon any in-flight recording; its thread is detached and the
    // process is exiting anyway
    if session.is_recording() {
        tracing::info!("Exiting with a recording in progress, discarding it");
        session.reset();
    }
    indicator.hide().await;

    let _ = shutdown_tx.send(true);
    if let Some(task) = supervisor_task {
        let _ = task.await;
    }

    listener.stop().await?;
    tracing::info!("pushtype daemon stopped");
    Ok(())
}

/// One press of the record hotkey: start a session if idle, otherwise
/// finish the current one.
async fn handle_toggle(
    config: &Config,
    session: &mut RecordingSession,
    indicator: &mut Indicator,
    transcriber: &Arc<dyn Transcriber>,
    injector: &Injector<WlClipboard, YdotoolKeySim>,
) {
    if session.is_idle() {
        match CaptureHandle::spawn(&config.audio) {
            Ok(capture) => {
                if session.start(capture, Instant::now()) {
                    tracing::info!("Recording started");
                    indicator.show();
                }
            }
            Err(e) => {
                tracing::error!("Could not start recording: {}", e);
                session.fail(e);
                session.reset();
            }
        }
        return;
    }

    let now = Instant::now();
    let Some((capture, deadline)) = session.begin_transcribing(now) else {
        tracing::debug!("Toggle ignored, session is {}", session);
        return;
    };
    indicator.hide().await;

    match finish_recording(config, capture, deadline, transcriber, injector, session).await {
        Ok(()) => session.complete(),
        Err(e) => {
            tracing::error!("Recording pipeline failed: {}", e);
            session.fail(e);
            session.reset();
        }
    }
}

/// Stop the capture thread, transcribe the samples, and paste the
/// transcript at the cursor.
async fn finish_recording(
    config: &Config,
    capture: CaptureHandle,
    deadline: Duration,
    transcriber: &Arc<dyn Transcriber>,
    injector: &Injector<WlClipboard, YdotoolKeySim>,
    session: &mut RecordingSession,
) -> Result<()> {
    tracing::info!("Recording stopped, transcribing");

    let samples = tokio::task::spawn_blocking(move || capture.stop_blocking(deadline))
        .await
        .map_err(|e| crate::error::PushtypeError::Task(format!("stop task panicked: {}", e)))??;

    let sample_rate = config.audio.sample_rate;
    let duration = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
    if duration < MIN_RECORDING {
        tracing::info!("Recording too short ({:?}), discarding", duration);
        return Ok(());
    }

    let transcriber = Arc::clone(transcriber);
    let transcript = tokio::task::spawn_blocking(move || transcriber.transcribe(&samples, sample_rate))
        .await
        .map_err(|e| crate::error::PushtypeError::Task(format!("transcribe task panicked: {}", e)))??;

    if transcript.trim().is_empty() {
        tracing::info!("Transcription came back empty, nothing to paste");
        return Ok(());
    }

    session.begin_injecting();
    injector.inject(&transcript).await?;
    Ok(())
}
