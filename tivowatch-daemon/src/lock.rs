//! Single-instance lock.
//!
//! The lock is a file at a well-known path holding the owning PID, one
//! line. A lock only blocks a new run while that PID names a live process;
//! anything else (dead owner, unparseable contents) is stale and removed,
//! so a crashed prior run never needs a human to clean up.
//!
//! The fresh lock is claimed with `create_new`, so two runs racing past the
//! staleness check cannot both own it — the loser sees Busy.
//!
//! Liveness is a kill-0 probe and is best-effort: a quickly reused PID can
//! read as a live owner. Accepted approximation for a single-host watcher.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LockError {
    LockError::Io {
        path: path.into(),
        source,
    }
}

/// Result of an acquisition attempt.
#[derive(Debug)]
pub enum Acquired {
    Owned(LockGuard),
    /// Another live process holds the lock. The PID is `None` only when a
    /// racing claimant won between our staleness check and our claim and
    /// its file could not be read back.
    Busy { pid: Option<i32> },
}

/// Owned lock. Releases (deletes) the lock file on drop, which covers
/// normal return, classified failure, fault unwind, and the shutdown path.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "lock released"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove lock file");
            }
        }
    }
}

/// What the lock file says right now, without acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Free,
    /// A live process owns the lock.
    Held { pid: i32 },
    /// A lock file exists but its owner is dead or its contents are not a
    /// PID; the next acquisition will remove it.
    Stale { pid: Option<i32> },
}

/// Acquire the lock, healing stale state along the way.
pub fn acquire(path: &Path) -> Result<Acquired, LockError> {
    match read_owner(path)? {
        Some(Ok(pid)) if process_alive(pid) => {
            return Ok(Acquired::Busy { pid: Some(pid) });
        }
        Some(Ok(pid)) => {
            tracing::warn!(
                path = %path.display(),
                owner_pid = pid,
                "removing stale lock left by a dead process",
            );
            remove_lenient(path)?;
        }
        Some(Err(())) => {
            tracing::warn!(path = %path.display(), "removing lock file with unparseable contents");
            remove_lenient(path)?;
        }
        None => {}
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            let pid = std::process::id();
            writeln!(file, "{pid}").map_err(|e| io_err(path, e))?;
            tracing::debug!(path = %path.display(), pid, "lock acquired");
            Ok(Acquired::Owned(LockGuard {
                path: path.to_path_buf(),
            }))
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let pid = read_owner(path)?.and_then(Result::ok);
            Ok(Acquired::Busy { pid })
        }
        Err(err) => Err(io_err(path, err)),
    }
}

/// Inspect the lock without touching it (CLI `status`).
pub fn inspect(path: &Path) -> Result<LockStatus, LockError> {
    Ok(match read_owner(path)? {
        None => LockStatus::Free,
        Some(Ok(pid)) if process_alive(pid) => LockStatus::Held { pid },
        Some(Ok(pid)) => LockStatus::Stale { pid: Some(pid) },
        Some(Err(())) => LockStatus::Stale { pid: None },
    })
}

/// `None` = no lock file; `Some(Ok(pid))` = parsed owner; `Some(Err(()))` =
/// file exists but does not contain a PID.
fn read_owner(path: &Path) -> Result<Option<Result<i32, ()>>, LockError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().parse::<i32>().map_err(|_| ()))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Is a process with this PID currently running? EPERM means the process
/// exists but belongs to someone else, so it counts as alive. PIDs that
/// cannot name a single process (0, negatives address process groups)
/// count as dead.
pub fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn remove_lenient(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
