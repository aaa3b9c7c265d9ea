//! On-screen recording indicator
//!
//! Runs a user-configured command (an overlay script, a notification
//! helper) while recording is active and stops it when recording ends.
//! Indicator failures are cosmetic and never abort a recording.

use crate::config::IndicatorConfig;
use std::time::Duration;
use tokio::process::{Child, Command};

pub struct Indicator {
    command: String,
    child: Option<Child>,
}

impl Indicator {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            command: config.command.clone(),
            child: None,
        }
    }

    /// Spawn the indicator process. No-op if no command is configured
    /// or one is already running.
    pub fn show(&mut self) {
        if self.command.is_empty() || self.child.is_some() {
            return;
        }
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return;
        };
        match Command::new(program).args(parts).spawn() {
            Ok(child) => self.child = Some(child),
            Err(e) => tracing::warn!("Failed to start indicator '{}': {}", self.command, e),
        }
    }

    /// Stop the indicator: SIGTERM first, SIGKILL if it lingers.
    pub async fn hide(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(target_os = "linux")]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        match tokio::time::timeout(Duration::from_millis(500), child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
    }
}
