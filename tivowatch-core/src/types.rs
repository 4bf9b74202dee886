//! Domain types for tivowatch.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. Summary types are serializable via serde for `--json` output.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Network address of the target media device (host or host:port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddr(pub String);

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DeviceAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceAddr {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Logical destination label a transfer is queued against on the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareName(pub String);

impl fmt::Display for ShareName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ShareName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ShareName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Named navigation/profile sequence the transfer client executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceName(pub String);

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SequenceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SequenceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Terminal classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The subordinate transfer client exited 0.
    Success,
    /// The subordinate exited non-zero, could not be started, or an
    /// orchestration stage faulted after the lock was taken.
    Failure,
    /// The watch directory held no eligible files; benign skip.
    NoFiles,
    /// Another live run holds the lock; benign skip.
    AlreadyRunning,
}

impl RunOutcome {
    /// Skipped outcomes perform no dispatch and send no notification.
    pub fn is_skip(self) -> bool {
        matches!(self, RunOutcome::NoFiles | RunOutcome::AlreadyRunning)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Failure => write!(f, "failure"),
            RunOutcome::NoFiles => write!(f, "no-files"),
            RunOutcome::AlreadyRunning => write!(f, "already-running"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// An eligible, sufficiently-aged media file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl CandidateFile {
    /// Final path component, for display and output matching.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// The subordinate transfer-client invocation for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJob {
    pub device: DeviceAddr,
    pub share: ShareName,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Combined stdout/stderr lines in arrival order.
    pub lines: Vec<String>,
    /// Process exit code; `None` when killed by a signal or never started.
    pub exit_code: Option<i32>,
    /// Set when the subordinate could not be spawned at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_error: Option<String>,
}

impl TransferJob {
    pub fn succeeded(&self) -> bool {
        self.spawn_error.is_none() && self.exit_code == Some(0)
    }

    /// Human-readable failure detail: the spawn error if the client never
    /// started, otherwise the last observed output line.
    pub fn error_detail(&self) -> String {
        if let Some(err) = &self.spawn_error {
            return format!("transfer client could not be started: {err}");
        }
        match self.lines.last() {
            Some(line) => line.clone(),
            None => match self.exit_code {
                Some(code) => format!("transfer client exited with status {code} and no output"),
                None => "transfer client terminated by signal with no output".to_string(),
            },
        }
    }
}

/// One execution of the watch → lock → dispatch → monitor → notify pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub started_at: DateTime<Utc>,
    pub watch_dir: PathBuf,
    pub device: DeviceAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareName>,
    pub files: Vec<CandidateFile>,
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<TransferJob>,
    pub duration_ms: u128,
}

impl Run {
    /// A fresh run at orchestration start. Outcome defaults to `NoFiles`
    /// until a later stage reclassifies it.
    pub fn begin(watch_dir: PathBuf, device: DeviceAddr) -> Self {
        Self {
            started_at: Utc::now(),
            watch_dir,
            device,
            share: None,
            files: Vec::new(),
            outcome: RunOutcome::NoFiles,
            error: None,
            job: None,
            duration_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
