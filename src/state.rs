//! Recording session state machine
//!
//! One capture-to-transcription-to-injection cycle:
//! Idle → Recording → Transcribing → Injecting → Idle,
//! with any state reaching Idle via Error. The capture thread handle is
//! owned exclusively by the session, so at most one recording can be in
//! flight per process; a start trigger while the session is not idle is
//! ignored by the guard in [`RecordingSession::start`].

use crate::audio::CaptureHandle;
use std::time::{Duration, Instant};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a start trigger
    Idle,
    /// Capture thread running
    Recording { started_at: Instant },
    /// Capture finished, audio handed to the transcription backend
    Transcribing,
    /// Transcript being pasted at the cursor
    Injecting,
    /// Something failed; reset() returns to Idle
    Error,
}

/// Deadline for the capture thread to wind down after a stop trigger.
///
/// Long recordings produce proportionally more buffered audio to flush,
/// so the allowance grows with elapsed recording time: 30s base plus 10s
/// per started minute.
pub fn stop_deadline(elapsed: Duration) -> Duration {
    let minutes = (elapsed.as_secs_f64() / 60.0).ceil() as u64;
    Duration::from_secs(30 + 10 * minutes)
}

/// One recording cycle, exclusive owner of the capture thread
pub struct RecordingSession {
    state: SessionState,
    capture: Option<CaptureHandle>,
    last_error: Option<String>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            capture: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording { .. })
    }

    pub fn recording_duration(&self, now: Instant) -> Option<Duration> {
        match self.state {
            SessionState::Recording { started_at } => Some(now.duration_since(started_at)),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Take ownership of a freshly spawned capture thread and enter
    /// Recording. Returns false (and drops nothing) if the session is
    /// not idle; the duplicate start is the caller's to ignore.
    pub fn start(&mut self, capture: CaptureHandle, now: Instant) -> bool {
        if !self.is_idle() {
            tracing::debug!("Start trigger ignored, session already {}", self);
            return false;
        }
        self.capture = Some(capture);
        self.last_error = None;
        self.state = SessionState::Recording { started_at: now };
        true
    }

    /// Leave Recording: hand the capture thread back to the caller
    /// together with the deadline it gets to finish, and enter
    /// Transcribing. Returns None if not recording.
    pub fn begin_transcribing(&mut self, now: Instant) -> Option<(CaptureHandle, Duration)> {
        let SessionState::Recording { started_at } = self.state else {
            return None;
        };
        let capture = self.capture.take()?;
        let deadline = stop_deadline(now.duration_since(started_at));
        self.state = SessionState::Transcribing;
        Some((capture, deadline))
    }

    /// Transcription succeeded; the transcript is being pasted
    pub fn begin_injecting(&mut self) {
        debug_assert_eq!(self.state, SessionState::Transcribing);
        self.state = SessionState::Injecting;
    }

    /// Cycle finished successfully
    pub fn complete(&mut self) {
        self.capture = None;
        self.state = SessionState::Idle;
    }

    /// Record a failure and enter Error
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.last_error = Some(error.to_string());
        self.capture = None;
        self.state = SessionState::Error;
    }

    /// Back to Idle from any state; never leaves the session stuck
    pub fn reset(&mut self) {
        self.capture = None;
        self.state = SessionState::Idle;
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Recording { started_at } => {
                write!(f, "recording ({:.1}s)", started_at.elapsed().as_secs_f32())
            }
            SessionState::Transcribing => write!(f, "transcribing"),
            SessionState::Injecting => write!(f, "injecting"),
            SessionState::Error => write!(
                f,
                "error ({})",
                self.last_error.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_deadline_grows_with_elapsed_minutes() {
        assert_eq!(stop_deadline(Duration::ZERO), Duration::from_secs(30));
        assert_eq!(stop_deadline(Duration::from_secs(30)), Duration::from_secs(40));
        assert_eq!(stop_deadline(Duration::from_secs(60)), Duration::from_secs(40));
        assert_eq!(stop_deadline(Duration::from_secs(61)), Duration::from_secs(50));
        assert_eq!(stop_deadline(Duration::from_secs(600)), Duration::from_secs(130));
    }

    #[test]
    fn new_session_is_idle() {
        let session = RecordingSession::new();
        assert!(session.is_idle());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn start_while_active_is_rejected() {
        let mut session = RecordingSession::new();
        let now = Instant::now();
        assert!(session.start(CaptureHandle::fake(vec![0.0]), now));
        assert!(!session.start(CaptureHandle::fake(vec![0.0]), now));
        assert!(session.is_recording());
    }

    #[test]
    fn happy_path_cycle() {
        let mut session = RecordingSession::new();
        let t0 = Instant::now();
        assert!(session.start(CaptureHandle::fake(vec![0.1; 16000]), t0));
        assert!(session.is_recording());
        assert_eq!(
            session.recording_duration(t0 + Duration::from_secs(2)),
            Some(Duration::from_secs(2))
        );

        let (capture, deadline) = session
            .begin_transcribing(t0 + Duration::from_secs(2))
            .expect("was recording");
        assert_eq!(session.state(), SessionState::Transcribing);
        assert_eq!(deadline, Duration::from_secs(40));
        let samples = capture
            .stop_blocking(Duration::from_secs(5))
            .expect("fake capture returns");
        assert_eq!(samples.len(), 16000);

        session.begin_injecting();
        assert_eq!(session.state(), SessionState::Injecting);
        session.complete();
        assert!(session.is_idle());
    }

    #[test]
    fn error_always_reaches_idle() {
        let mut session = RecordingSession::new();
        session.start(CaptureHandle::fake(vec![]), Instant::now());
        session.fail("backend unavailable");
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.last_error(), Some("backend unavailable"));
        session.reset();
        assert!(session.is_idle());
    }

    #[test]
    fn begin_transcribing_requires_recording() {
        let mut session = RecordingSession::new();
        assert!(session.begin_transcribing(Instant::now()).is_none());
    }
}
