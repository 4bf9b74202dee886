//! Share resolver — map the watch directory to a destination share label.
//!
//! The transfer client knows which configured share path matches a
//! directory (`--find-share <path>`) and can enumerate all shares
//! (`--list-shares`). Resolution is advisory: any failure falls back to the
//! fixed default label instead of failing the run, logged at warn level so
//! the fallback stays observable.

use std::path::Path;
use std::process::Command;

use tivowatch_core::{Config, ShareName};

use crate::error::TransferError;

/// Label used when discovery fails or matches nothing. Mirrors the share
/// section name the importer configuration conventionally uses.
pub const DEFAULT_SHARE: &str = "tivo-importer";

/// Resolve the destination share for this run.
pub fn resolve(config: &Config) -> ShareName {
    if let Some(share) = &config.share_override {
        return share.clone();
    }

    match find_share(config, &config.watch_dir) {
        Ok(Some(share)) => {
            tracing::debug!(share = %share, "resolved share from transfer client");
            share
        }
        Ok(None) => {
            tracing::warn!(
                watch_dir = %config.watch_dir.display(),
                fallback = DEFAULT_SHARE,
                "no share matches the watch directory, using default",
            );
            ShareName::from(DEFAULT_SHARE)
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                fallback = DEFAULT_SHARE,
                "share discovery failed, using default",
            );
            ShareName::from(DEFAULT_SHARE)
        }
    }
}

/// Ask the transfer client which share is configured for `path`.
pub fn find_share(config: &Config, path: &Path) -> Result<Option<ShareName>, TransferError> {
    let output = Command::new(&config.transfer_cmd)
        .arg("--find-share")
        .arg(path)
        .output()
        .map_err(|e| TransferError::Spawn {
            cmd: config.transfer_cmd.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(client_failed(&output));
    }

    Ok(first_nonempty_line(&output.stdout).map(ShareName::from))
}

/// Enumerate every share the transfer client knows, one label per line.
pub fn list_shares(config: &Config) -> Result<Vec<ShareName>, TransferError> {
    let output = Command::new(&config.transfer_cmd)
        .arg("--list-shares")
        .output()
        .map_err(|e| TransferError::Spawn {
            cmd: config.transfer_cmd.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(client_failed(&output));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ShareName::from)
        .collect())
}

fn client_failed(output: &std::process::Output) -> TransferError {
    TransferError::ClientFailed {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn first_nonempty_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
