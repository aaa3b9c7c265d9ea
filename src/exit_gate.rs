//! Exit confirmation gate
//!
//! A single stray exit key press must never terminate the process.
//! The first press arms the gate and starts a confirmation window; a
//! second press inside the window terminates. The window elapsing is
//! the only other way back to the unarmed state; unrelated triggers
//! neither consume nor refresh it.

use std::time::{Duration, Instant};

/// Outcome of an exit key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// First press: armed, waiting for confirmation
    Armed,
    /// Second press inside the window: shut down
    Terminate,
}

/// Two-stage confirmation guarding process termination
pub struct ExitGate {
    window: Duration,
    pending_since: Option<Instant>,
}

impl ExitGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending_since: None,
        }
    }

    /// Record an exit key press at `now`
    pub fn on_exit_trigger(&mut self, now: Instant) -> GateDecision {
        match self.pending_since {
            Some(armed_at) if now.duration_since(armed_at) <= self.window => {
                self.pending_since = None;
                GateDecision::Terminate
            }
            _ => {
                // Either unarmed, or the previous arming expired: (re)arm.
                self.pending_since = Some(now);
                GateDecision::Armed
            }
        }
    }

    /// Whether the gate is currently armed
    pub fn is_armed(&self, now: Instant) -> bool {
        matches!(self.pending_since, Some(t) if now.duration_since(t) <= self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    #[test]
    fn single_press_only_arms() {
        let mut gate = ExitGate::new(WINDOW);
        let t0 = Instant::now();
        assert_eq!(gate.on_exit_trigger(t0), GateDecision::Armed);
        assert!(gate.is_armed(t0));
    }

    #[test]
    fn double_press_within_window_terminates() {
        let mut gate = ExitGate::new(WINDOW);
        let t0 = Instant::now();
        gate.on_exit_trigger(t0);
        assert_eq!(
            gate.on_exit_trigger(t0 + Duration::from_millis(800)),
            GateDecision::Terminate
        );
    }

    #[test]
    fn second_press_after_window_rearms() {
        let mut gate = ExitGate::new(WINDOW);
        let t0 = Instant::now();
        gate.on_exit_trigger(t0);
        // 3s later: the arming expired, this press arms again
        assert_eq!(
            gate.on_exit_trigger(t0 + Duration::from_secs(3)),
            GateDecision::Armed
        );
        // ...and a prompt follow-up now terminates
        assert_eq!(
            gate.on_exit_trigger(t0 + Duration::from_millis(3500)),
            GateDecision::Terminate
        );
    }

    #[test]
    fn arming_silently_expires() {
        let mut gate = ExitGate::new(WINDOW);
        let t0 = Instant::now();
        gate.on_exit_trigger(t0);
        assert!(!gate.is_armed(t0 + Duration::from_millis(2001)));
    }

    #[test]
    fn terminate_consumes_armed_state() {
        let mut gate = ExitGate::new(WINDOW);
        let t0 = Instant::now();
        gate.on_exit_trigger(t0);
        gate.on_exit_trigger(t0 + Duration::from_millis(100));
        assert!(!gate.is_armed(t0 + Duration::from_millis(200)));
    }
}
