//! Error types for tivowatch-core.

use thiserror::Error;

/// Errors raised while building a [`crate::Config`] from key/value pairs.
///
/// The scan path never errors — a missing or unreadable watch directory is
/// an empty candidate list, not a failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric configuration value did not parse.
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A value that must be non-empty was set to an empty string.
    #[error("{key} is set but empty")]
    Empty { key: &'static str },
}
