//! Tivowatch orchestration — single-instance lock, run pipeline, loop.
//!
//! - [`lock`] — PID-file mutual exclusion with stale-lock self-healing
//! - [`run`] — one watch → lock → dispatch → monitor → notify run
//! - [`runtime`] — fire-and-exit and supervised-loop entrypoints

pub mod error;
pub mod lock;
pub mod run;
pub mod runtime;

pub use error::DaemonError;
pub use lock::{Acquired, LockGuard, LockStatus};
pub use run::{exit_code, RunResult, ORCHESTRATION_ERROR_CODE};
pub use runtime::{init_tracing, run_once_blocking, watch_blocking};
