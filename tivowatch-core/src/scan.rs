//! Watch evaluator — decide which files in the watch directory are ready.
//!
//! Lists direct entries only (no recursion). Symlinks to regular files
//! count; extension matching is case-insensitive; entries younger than the
//! minimum age are skipped so a file still being written is never queued.
//!
//! This path never errors: a missing, unreadable, or empty directory is an
//! empty candidate list and the orchestrator treats that as a benign skip.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use crate::types::CandidateFile;

/// Scan `dir` for eligible media files, sorted by path.
pub fn scan(dir: &Path, extensions: &[String], min_age: Duration) -> Vec<CandidateFile> {
    scan_at(dir, extensions, min_age, SystemTime::now())
}

/// [`scan`] with an explicit "now", so tests control the age cutoff.
pub fn scan_at(
    dir: &Path,
    extensions: &[String],
    min_age: Duration,
    now: SystemTime,
) -> Vec<CandidateFile> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), error = %err, "watch directory not readable");
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();

        if !matches_extension(&path, extensions) {
            continue;
        }

        // fs::metadata follows symlinks, so a link to a video file counts
        // and a link to a directory is filtered by is_file below.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping entry without metadata");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping entry without mtime");
                continue;
            }
        };

        // A future mtime means the age subtraction fails; treat as too young.
        let old_enough = now
            .duration_since(modified)
            .map(|age| age >= min_age)
            .unwrap_or(false);
        if !old_enough {
            tracing::debug!(path = %path.display(), "file younger than minimum age, skipping");
            continue;
        }

        candidates.push(CandidateFile {
            path,
            modified: DateTime::<Utc>::from(modified),
        });
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
