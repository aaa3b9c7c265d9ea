//! Clipboard access and the clipboard guard
//!
//! Every programmatic clipboard mutation in pushtype goes through
//! [`run_guarded`]: the user's clipboard content is read before the
//! operation and written back after it, on success and on failure
//! alike, so dictation and formatting stay transparent to whatever the
//! user had copied. A settle delay between the paste chord and the
//! restore gives the target application time to read the clipboard
//! first; the delay is best-effort race mitigation, not a guarantee.
//!
//! Known race: the dictation daemon and the format worker each guard
//! their own mutation but share no cross-process lock, so two
//! operations landing in the same narrow window can clobber each other.
//! This mirrors the behavior of the tools this replaces.

use crate::error::OutputError;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// System clipboard access
#[async_trait::async_trait]
pub trait Clipboard: Send + Sync {
    async fn read(&self) -> Result<String, OutputError>;
    async fn write(&self, text: &str) -> Result<(), OutputError>;
}

/// Wayland clipboard via wl-copy / wl-paste subprocesses
pub struct WlClipboard;

#[async_trait::async_trait]
impl Clipboard for WlClipboard {
    async fn read(&self) -> Result<String, OutputError> {
        let output = Command::new("wl-paste")
            .arg("--no-newline")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::WlPasteNotFound
                } else {
                    OutputError::ClipboardRead(e.to_string())
                }
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .map_err(|e| OutputError::ClipboardRead(format!("non-UTF8 clipboard: {}", e)))
        } else {
            // wl-paste exits non-zero on an empty clipboard; treat as empty
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Nothing is copied") || stderr.is_empty() {
                Ok(String::new())
            } else {
                Err(OutputError::ClipboardRead(stderr.into_owned()))
            }
        }
    }

    async fn write(&self, text: &str) -> Result<(), OutputError> {
        let mut child = Command::new("wl-copy")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::WlCopyNotFound
                } else {
                    OutputError::ClipboardWrite(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| OutputError::ClipboardWrite(e.to_string()))?;
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| OutputError::ClipboardWrite(e.to_string()))?;

        if !status.success() {
            return Err(OutputError::ClipboardWrite(
                "wl-copy exited with error".to_string(),
            ));
        }

        Ok(())
    }
}

/// Run a clipboard-mutating operation with scoped save/restore.
///
/// The clipboard is read before `op` runs and restored after it
/// returns, whether it succeeded or not. The settle delay runs before
/// the restore so the paste target can read the clipboard first. A
/// failed restore is logged and swallowed: the operation's own outcome
/// stays authoritative.
pub async fn run_guarded<C, F, Fut, T>(
    clipboard: &C,
    settle: Duration,
    op: F,
) -> Result<T, OutputError>
where
    C: Clipboard + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, OutputError>>,
{
    // If the snapshot itself fails we still run the operation, but skip
    // the restore rather than clobber the clipboard with a guess.
    let saved = match clipboard.read().await {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!("Could not snapshot clipboard before operation: {}", e);
            None
        }
    };

    let result = op().await;

    tokio::time::sleep(settle).await;

    if let Some(content) = saved {
        if let Err(e) = clipboard.write(&content).await {
            tracing::warn!("Clipboard restore failed (ignored): {}", e);
        }
    }

    result
}
