//! Error types for tivowatch-daemon.

use thiserror::Error;

/// Error surface for the runtime entrypoints. Failures *inside* a run are
/// not errors here — they are classified into the run's outcome so the
/// pipeline can still notify and release the lock.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("runtime error: {0}")]
    Runtime(String),
}
