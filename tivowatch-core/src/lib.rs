//! Tivowatch core library — domain types, configuration, watch-directory scan.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs ([`Run`], [`CandidateFile`], …)
//! - [`config`] — explicit [`Config`] built from env-style key/value pairs
//! - [`scan`] — the watch evaluator
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod scan;
pub mod types;

pub use config::{Config, MailConfig};
pub use error::ConfigError;
pub use types::{CandidateFile, DeviceAddr, Run, RunOutcome, SequenceName, ShareName, TransferJob};
