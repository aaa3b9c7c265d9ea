//! Format-worker process supervisor
//!
//! The text-formatting hotkey runs in a separate process so an LLM
//! crash cannot take the dictation daemon down with it. The supervisor
//! spawns the worker, watches its exit status, and restarts it with
//! exponential backoff until the attempt budget runs out.
//!
//! Exit code contract with the worker:
//!   0      clean shutdown, do not restart
//!   1      another worker already holds the instance lock, do not restart
//!   other  crash, restart with backoff

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

/// How a worker process ended, as far as restart policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exit code 0.
    Normal,
    /// Exit code 1: another instance holds the lock.
    Duplicate,
    /// Any other exit code, or killed by a signal.
    Crashed,
}

impl WorkerExit {
    pub fn classify(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => WorkerExit::Normal,
            Some(1) => WorkerExit::Duplicate,
            _ => WorkerExit::Crashed,
        }
    }
}

/// What the supervisor should do after a worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    Stop,
    GiveUp,
    RestartAfter(Duration),
}

/// Restart policy: which exits warrant a restart, and with what delay.
pub struct RestartPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RestartPolicy {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Decide what to do after launch number `attempt` (1-based) exits.
    pub fn decide(&self, exit: WorkerExit, attempt: u32) -> RestartDecision {
        match exit {
            WorkerExit::Normal | WorkerExit::Duplicate => RestartDecision::Stop,
            WorkerExit::Crashed => {
                if attempt >= self.max_attempts {
                    RestartDecision::GiveUp
                } else {
                    RestartDecision::RestartAfter(self.next_delay(attempt))
                }
            }
        }
    }

    /// Backoff before the restart that follows launch `attempt`:
    /// base * 2^(attempt - 1), capped at max_delay.
    fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

/// Run the format worker under supervision until it exits cleanly, the
/// attempt budget runs out, or `shutdown` fires.
pub async fn supervise(
    config: &SupervisorConfig,
    config_path: Option<std::path::PathBuf>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SupervisorError> {
    let policy = RestartPolicy::new(config);
    let exe = std::env::current_exe()
        .map_err(|e| SupervisorError::Spawn(format!("cannot locate own binary: {}", e)))?;

    let mut attempt: u32 = 1;
    loop {
        tracing::info!("Starting format worker (attempt {})", attempt);
        let mut cmd = Command::new(&exe);
        if let Some(path) = &config_path {
            cmd.arg("--config").arg(path);
        }
        let mut child = cmd
            .arg("format-worker")
            .spawn()
            .map_err(|e| SupervisorError::Spawn(e.to_string()))?;

        let status = tokio::select! {
            status = child.wait() => {
                status.map_err(|e| SupervisorError::Spawn(e.to_string()))?
            }
            _ = shutdown.changed() => {
                tracing::info!("Shutting down format worker");
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Ok(());
            }
        };

        let exit = WorkerExit::classify(status);
        match policy.decide(exit, attempt) {
            RestartDecision::Stop => {
                match exit {
                    WorkerExit::Duplicate => {
                        tracing::warn!("Format worker found another instance running, not restarting")
                    }
                    _ => tracing::info!("Format worker exited cleanly"),
                }
                return Ok(());
            }
            RestartDecision::GiveUp => {
                tracing::error!(
                    "Format worker crashed on all {} attempts, giving up",
                    attempt
                );
                return Err(SupervisorError::AttemptsExhausted(attempt));
            }
            RestartDecision::RestartAfter(delay) => {
                tracing::warn!(
                    "Format worker crashed ({}), restarting in {:?}",
                    status,
                    delay
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => return Ok(()),
                }
                attempt += 1;
            }
        }
    }
}
