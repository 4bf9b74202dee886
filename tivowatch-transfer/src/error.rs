//! Error types for tivowatch-transfer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from share-discovery invocations of the transfer client.
///
/// The dispatch path deliberately has no error type of its own: a failed or
/// unstartable transfer is still a completed [`tivowatch_core::TransferJob`]
/// carrying its failure detail, because the run must classify and report it
/// rather than bail.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to invoke {cmd}: {source}")]
    Spawn {
        cmd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer client exited with {status}: {stderr}")]
    ClientFailed { status: String, stderr: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.into(),
        source,
    }
}
