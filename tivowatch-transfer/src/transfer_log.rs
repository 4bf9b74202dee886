//! Append-only transfer log.
//!
//! Every line the subordinate transfer client emits is appended here with a
//! timestamp taken at the moment it arrived, so a supervising operator can
//! tail long-running transfers in real time.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, TransferError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle on the durable log file. Cheap to clone; each append opens the
/// file, so concurrent tailing never holds it hostage.
#[derive(Debug, Clone)]
pub struct TransferLog {
    path: PathBuf,
}

impl TransferLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, timestamped at the point of emission.
    pub fn append(&self, line: &str) -> Result<(), TransferError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        writeln!(file, "{} {}", Utc::now().format(TIMESTAMP_FORMAT), line)
            .map_err(|e| io_err(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_creates_and_timestamps_lines() {
        let dir = TempDir::new().expect("dir");
        let log = TransferLog::new(dir.path().join("transfer.log"));

        log.append("Start sending \"a.mkv\"").expect("append");
        log.append("Done sending \"a.mkv\"").expect("append");

        let contents = std::fs::read_to_string(log.path()).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Start sending \"a.mkv\""));
        assert!(lines[1].ends_with("Done sending \"a.mkv\""));
        // timestamp prefix: "YYYY-MM-DD HH:MM:SS "
        assert_eq!(&lines[0][4..5], "-");
        assert_eq!(&lines[0][10..11], " ");
    }

    #[test]
    fn append_to_unwritable_path_reports_io_error() {
        let log = TransferLog::new("/nonexistent-root-dir/transfer.log");
        let err = log.append("line").expect_err("should fail");
        assert!(matches!(err, TransferError::Io { .. }));
    }
}
