//! Notification composition.
//!
//! A [`Notification`] is derived from a terminal run and never mutated.
//! Per-file statuses come from the transfer client's own output: the client
//! logs `Start sending "<file>"` when a transfer begins and
//! `Done sending "<file>"` when it completes, so a file seen in a Done line
//! reports as transferred and everything else discovered for the run stays
//! at queued.

use std::fmt;

use tivowatch_core::{Run, RunOutcome, TransferJob};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

const DONE_MARKER: &str = "Done sending \"";

/// Composed outcome report, ready for the mail relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body_html: String,
}

/// What the transfer client's output tells us about one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Discovered and handed to the client; no completion line observed.
    Queued,
    /// A `Done sending` line named this file.
    Transferred,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Queued => write!(f, "queued"),
            FileStatus::Transferred => write!(f, "transferred"),
        }
    }
}

/// Compose a notification for a terminal run. Skipped outcomes produce no
/// notification at all.
pub fn compose(run: &Run) -> Option<Notification> {
    match run.outcome {
        RunOutcome::Success => Some(success_notification(run)),
        RunOutcome::Failure => Some(failure_notification(run)),
        RunOutcome::NoFiles | RunOutcome::AlreadyRunning => None,
    }
}

/// Per-file statuses for the success table, in discovery order.
pub fn file_statuses(run: &Run) -> Vec<(String, FileStatus)> {
    let done: Vec<String> = run
        .job
        .as_ref()
        .map(|job| completed_files(job))
        .unwrap_or_default();

    run.files
        .iter()
        .map(|file| {
            let name = file.file_name();
            let status = if done.iter().any(|d| *d == name) {
                FileStatus::Transferred
            } else {
                FileStatus::Queued
            };
            (name, status)
        })
        .collect()
}

/// File names the client reported completed. Done lines carry either the
/// bare name or a full path; compare by final component.
fn completed_files(job: &TransferJob) -> Vec<String> {
    job.lines
        .iter()
        .filter_map(|line| quoted_name(line, DONE_MARKER))
        .collect()
}

fn quoted_name(line: &str, marker: &str) -> Option<String> {
    let rest = &line[line.find(marker)? + marker.len()..];
    let name = &rest[..rest.find('"')?];
    let base = name.rsplit('/').next().unwrap_or(name);
    Some(base.to_string())
}

fn success_notification(run: &Run) -> Notification {
    let count = run.files.len();
    let plural = if count == 1 { "file" } else { "files" };
    let subject = format!("tivowatch: {count} {plural} sent to TiVo");

    let mut rows = String::new();
    for (name, status) in file_statuses(run) {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape_html(&name),
            status
        ));
    }

    let body_html = format!(
        "<html><body>\n\
         <h2>Transfer complete</h2>\n\
         <p>Device: {device}<br>\n\
         Started: {started}<br>\n\
         Duration: {duration}</p>\n\
         <table border=\"1\" cellpadding=\"4\">\n\
         <tr><th>File</th><th>Status</th></tr>\n\
         {rows}</table>\n\
         </body></html>\n",
        device = escape_html(&run.device.0),
        started = run.started_at.format(TIMESTAMP_FORMAT),
        duration = format_duration_ms(run.duration_ms),
        rows = rows,
    );

    Notification { subject, body_html }
}

fn failure_notification(run: &Run) -> Notification {
    let subject = "tivowatch: transfer FAILED".to_string();

    let detail = run
        .error
        .clone()
        .or_else(|| run.job.as_ref().map(TransferJob::error_detail))
        .unwrap_or_else(|| "unknown error".to_string());

    let queued = if run.files.is_empty() {
        "<p>No files had been queued.</p>\n".to_string()
    } else {
        let items: String = run
            .files
            .iter()
            .map(|file| format!("<li>{}</li>\n", escape_html(&file.file_name())))
            .collect();
        format!("<p>Files queued before the failure:</p>\n<ul>\n{items}</ul>\n")
    };

    let body_html = format!(
        "<html><body>\n\
         <h2>Transfer failed</h2>\n\
         <p>Device: {device}<br>\n\
         Started: {started}</p>\n\
         <p><b>Error:</b> {detail}</p>\n\
         {queued}\
         </body></html>\n",
        device = escape_html(&run.device.0),
        started = run.started_at.format(TIMESTAMP_FORMAT),
        detail = escape_html(&detail),
        queued = queued,
    );

    Notification { subject, body_html }
}

fn format_duration_ms(ms: u128) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
