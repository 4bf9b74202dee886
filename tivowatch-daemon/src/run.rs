//! One run of the pipeline.
//!
//! State sequence per tick:
//! `Idle → Scanning → (NoFiles | Locking) → (Busy | Dispatching) →
//! Monitoring → Notifying → Idle`.
//!
//! An empty scan and a busy lock are benign terminals with no side effects
//! beyond logging. Once the lock is held, every path — success, dispatch
//! failure, stage fault — flows through notification and releases the lock
//! via guard drop. A shutdown during monitoring kills the subordinate,
//! releases the lock, and skips notification: a half-finished run has no
//! reportable outcome.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::Instant;

use tivowatch_core::{scan, Config, Run, RunOutcome};
use tivowatch_notify::{notify, Mailer};
use tivowatch_transfer::{dispatch, resolver, Dispatch, TransferLog};

use crate::lock::{self, Acquired};

/// Exit code reported when a run fails without a usable subordinate exit
/// code (spawn failure, signal kill, orchestration fault). EX_SOFTWARE.
pub const ORCHESTRATION_ERROR_CODE: i32 = 70;

/// Outcome of one pipeline tick.
#[derive(Debug)]
pub enum RunResult {
    Completed(Run),
    /// External termination arrived mid-run; lock released, no report.
    Aborted,
}

/// Execute one full run.
pub async fn run_once(
    config: &Config,
    mailer: &Arc<dyn Mailer>,
    shutdown: &mut broadcast::Receiver<()>,
) -> RunResult {
    let started = Instant::now();
    let mut run = Run::begin(config.watch_dir.clone(), config.device.clone());

    // Scanning
    let files = scan::scan(&config.watch_dir, &config.extensions, config.min_file_age);
    if files.is_empty() {
        run.outcome = RunOutcome::NoFiles;
        run.duration_ms = started.elapsed().as_millis();
        tracing::info!(
            watch_dir = %config.watch_dir.display(),
            "no eligible files, nothing to do",
        );
        return RunResult::Completed(run);
    }
    tracing::info!(count = files.len(), "eligible files found");
    for file in &files {
        tracing::info!(file = %file.file_name(), "candidate");
    }
    run.files = files;

    // Locking
    let guard = match lock::acquire(&config.lock_file) {
        Ok(Acquired::Owned(guard)) => guard,
        Ok(Acquired::Busy { pid }) => {
            run.outcome = RunOutcome::AlreadyRunning;
            run.duration_ms = started.elapsed().as_millis();
            tracing::info!(owner_pid = ?pid, "another run holds the lock, skipping");
            return RunResult::Completed(run);
        }
        Err(err) => {
            // Fault before the lock was taken; nothing to release, but the
            // failure is still classified and reported.
            run.outcome = RunOutcome::Failure;
            run.error = Some(err.to_string());
            run.duration_ms = started.elapsed().as_millis();
            send_notification(&run, config, mailer).await;
            return RunResult::Completed(run);
        }
    };

    // Dispatching → Monitoring
    let aborted = drive_locked(config, &mut run, shutdown).await;
    if aborted {
        drop(guard);
        return RunResult::Aborted;
    }
    run.duration_ms = started.elapsed().as_millis();

    // Notifying — lock released once this transition completes, whatever
    // the delivery result was.
    send_notification(&run, config, mailer).await;
    drop(guard);

    RunResult::Completed(run)
}

/// Stages that run under the lock. Returns true when shut down mid-flight.
/// Any stage fault lands in the run as a Failure classification instead of
/// propagating, so the caller always reaches Notifying.
async fn drive_locked(
    config: &Config,
    run: &mut Run,
    shutdown: &mut broadcast::Receiver<()>,
) -> bool {
    // Resolving (advisory, never fails the run by itself)
    let resolve_config = config.clone();
    let share = match tokio::task::spawn_blocking(move || resolver::resolve(&resolve_config)).await
    {
        Ok(share) => share,
        Err(err) => {
            run.outcome = RunOutcome::Failure;
            run.error = Some(format!("share resolution task failed: {err}"));
            return false;
        }
    };
    tracing::info!(share = %share, "destination share resolved");
    run.share = Some(share.clone());

    let log = TransferLog::new(config.log_file.clone());
    match dispatch::dispatch(config, &share, &log, shutdown).await {
        Dispatch::Aborted => true,
        Dispatch::Completed(job) => {
            if job.succeeded() {
                run.outcome = RunOutcome::Success;
            } else {
                run.outcome = RunOutcome::Failure;
                run.error = Some(job.error_detail());
            }
            run.job = Some(job);
            false
        }
    }
}

/// Notification is blocking SMTP; keep it off the async runtime. Its
/// result is logged and nothing more — delivery failure never reclassifies
/// the run.
async fn send_notification(run: &Run, config: &Config, mailer: &Arc<dyn Mailer>) {
    let run = run.clone();
    let mail = config.mail.clone();
    let mailer = Arc::clone(mailer);
    match tokio::task::spawn_blocking(move || notify(&run, &mail, mailer.as_ref())).await {
        Ok(result) => tracing::info!(result = ?result, "notification step finished"),
        Err(err) => tracing::error!(error = %err, "notification task failed"),
    }
}

/// Map a run result to the fire-and-exit process exit status: 0 for
/// success and both benign skips; the subordinate's own code (or
/// [`ORCHESTRATION_ERROR_CODE`]) for failures; 130 for a ctrl-c abort.
pub fn exit_code(result: &RunResult) -> i32 {
    match result {
        RunResult::Aborted => 130,
        RunResult::Completed(run) => match run.outcome {
            RunOutcome::Success | RunOutcome::NoFiles | RunOutcome::AlreadyRunning => 0,
            RunOutcome::Failure => run
                .job
                .as_ref()
                .and_then(|job| job.exit_code)
                .filter(|code| *code != 0)
                .unwrap_or(ORCHESTRATION_ERROR_CODE),
        },
    }
}
