//! Single-instance locking
//!
//! Prevents two daemons (or two format workers) from grabbing the same
//! input devices. The capability is a named exclusive resource; the
//! provided backend is a pid file under the runtime directory, where a
//! stale file left by a crashed process is reclaimed by pidlock's
//! liveness check.

use pidlock::Pidlock;
use std::path::{Path, PathBuf};

/// Exclusive ownership of a named resource, at most one holder per
/// machine. Acquisition is non-blocking; a held lock is released
/// explicitly or on drop.
pub trait NamedLock {
    fn try_acquire(&mut self) -> bool;
    fn release(&mut self);
    fn is_held(&self) -> bool;
}

/// Pid-file backed lock.
pub struct PidfileLock {
    lock: Pidlock,
    path: PathBuf,
    held: bool,
}

impl PidfileLock {
    /// Lock for `role` ("daemon" or "format-worker") under `dir`.
    pub fn for_role(dir: &Path, role: &str) -> Self {
        Self::at(dir.join(format!("{}.pid", role)))
    }

    /// Lock at an explicit pid-file path.
    pub fn at(path: PathBuf) -> Self {
        let lock = Pidlock::new(&path.to_string_lossy());
        Self {
            lock,
            path,
            held: false,
        }
    }
}

impl NamedLock for PidfileLock {
    fn try_acquire(&mut self) -> bool {
        if self.held {
            return true;
        }
        match self.lock.acquire() {
            Ok(()) => {
                tracing::debug!("Acquired instance lock at {:?}", self.path);
                self.held = true;
                true
            }
            Err(e) => {
                tracing::debug!("Instance lock at {:?} unavailable: {:?}", self.path, e);
                false
            }
        }
    }

    fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if let Err(e) = self.lock.release() {
            tracing::warn!("Failed to release instance lock at {:?}: {:?}", self.path, e);
        }
    }

    fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for PidfileLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = PidfileLock::for_role(dir.path(), "daemon");
        assert!(first.try_acquire());
        assert!(first.is_held());

        let mut second = PidfileLock::for_role(dir.path(), "daemon");
        assert!(!second.try_acquire());
        assert!(!second.is_held());
    }

    #[test]
    fn reacquire_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = PidfileLock::for_role(dir.path(), "daemon");
        assert!(first.try_acquire());
        first.release();
        assert!(!first.is_held());

        let mut second = PidfileLock::for_role(dir.path(), "daemon");
        assert!(second.try_acquire());
    }

    #[test]
    fn drop_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut lock = PidfileLock::for_role(dir.path(), "daemon");
            assert!(lock.try_acquire());
        }
        let mut again = PidfileLock::for_role(dir.path(), "daemon");
        assert!(again.try_acquire());
    }

    #[test]
    fn different_roles_do_not_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut daemon = PidfileLock::for_role(dir.path(), "daemon");
        let mut worker = PidfileLock::for_role(dir.path(), "format-worker");
        assert!(daemon.try_acquire());
        assert!(worker.try_acquire());
    }
}
