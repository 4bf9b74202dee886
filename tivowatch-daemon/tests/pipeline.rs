//! End-to-end pipeline runs against a scripted transfer client.
//!
//! Each test drives `run_once` with a temp watch directory, a `/bin/sh`
//! stand-in for the transfer client, and a recording mailer, then asserts
//! outcome classification, lock hygiene, and notification content.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use tivowatch_core::{Config, DeviceAddr, Run, RunOutcome};
use tivowatch_daemon::run::{exit_code, run_once, RunResult};
use tivowatch_notify::{MailError, Mailer, OutgoingMessage};

/// Above any realistic kernel pid_max.
const DEAD_PID: i32 = 2_000_000_000;

#[derive(Default)]
struct Outbox {
    messages: Mutex<Vec<OutgoingMessage>>,
}

impl Outbox {
    fn take(&self) -> Vec<OutgoingMessage> {
        std::mem::take(&mut self.messages.lock().expect("lock"))
    }
}

struct RecordingMailer {
    outbox: Arc<Outbox>,
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        self.outbox
            .messages
            .lock()
            .expect("lock")
            .push(message.clone());
        Ok(())
    }
}

struct Harness {
    _dir: TempDir,
    config: Config,
    outbox: Arc<Outbox>,
    mailer: Arc<dyn Mailer>,
    /// Touched by the fake client on every dispatch.
    dispatch_marker: PathBuf,
}

impl Harness {
    /// `client_body` runs after the marker touch; it sees `$1`=device,
    /// `$2`=sequence, `$TIVO_SHARE`.
    fn new(client_body: &str, recipient: Option<&str>) -> Self {
        let dir = TempDir::new().expect("dir");
        let watch_dir = dir.path().join("watch");
        fs::create_dir(&watch_dir).expect("mkdir watch");

        let dispatch_marker = dir.path().join("dispatched");
        let client = dir.path().join("pytivo-transfer");
        // The same binary answers share discovery and dispatch; only the
        // dispatch path touches the marker.
        fs::write(
            &client,
            format!(
                "#!/bin/sh\n\
                 case \"$1\" in --find-share) echo 'Incoming'; exit 0;; esac\n\
                 touch '{}'\n{}\n",
                dispatch_marker.display(),
                client_body
            ),
        )
        .expect("write client");
        fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).expect("chmod");

        let mut config = Config {
            device: DeviceAddr::from("10.0.0.9"),
            watch_dir,
            min_file_age: Duration::from_secs(60),
            transfer_cmd: client,
            lock_file: dir.path().join("tivowatch.pid"),
            log_file: dir.path().join("transfer.log"),
            ..Config::default()
        };
        config.mail.to = recipient.map(str::to_string);

        let outbox = Arc::new(Outbox::default());
        let mailer: Arc<dyn Mailer> = Arc::new(RecordingMailer {
            outbox: Arc::clone(&outbox),
        });

        Self {
            _dir: dir,
            config,
            outbox,
            mailer,
            dispatch_marker,
        }
    }

    /// Drop an already-aged eligible file into the watch directory.
    fn add_old_file(&self, name: &str) -> PathBuf {
        let path = self.config.watch_dir.join(name);
        fs::write(&path, b"payload").expect("write media file");
        backdate(&path, 3600);
        path
    }

    async fn run(&self) -> RunResult {
        let (_tx, mut rx) = broadcast::channel::<()>(1);
        run_once(&self.config, &self.mailer, &mut rx).await
    }

    fn dispatched(&self) -> bool {
        self.dispatch_marker.exists()
    }
}

fn backdate(path: &Path, secs: i64) {
    let mtime = filetime::FileTime::from_unix_time(
        filetime::FileTime::now().unix_seconds() - secs,
        0,
    );
    filetime::set_file_mtime(path, mtime).expect("set mtime");
}

fn completed(result: RunResult) -> Run {
    match result {
        RunResult::Completed(run) => run,
        RunResult::Aborted => panic!("run unexpectedly aborted"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_one_old_file_transfers_and_reports_success() {
    let harness = Harness::new(
        "echo \"Start sending \\\"show.mkv\\\" to TiVo\"\n\
         echo \"Done sending \\\"show.mkv\\\" to TiVo\"\n\
         exit 0",
        Some("ops@example.net"),
    );
    harness.add_old_file("show.mkv");

    let result = harness.run().await;
    assert_eq!(exit_code(&result), 0);
    let run = completed(result);

    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.files.len(), 1);
    assert!(harness.dispatched());
    assert!(
        !harness.config.lock_file.exists(),
        "lock must be released after the run"
    );

    let sent = harness.outbox.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "tivowatch: 1 file sent to TiVo");
    assert!(sent[0].body_html.contains("show.mkv"));
    assert!(sent[0].body_html.contains("transferred"));
}

#[tokio::test]
async fn scenario_b_young_file_is_no_files_with_no_side_effects() {
    let harness = Harness::new("exit 0", Some("ops@example.net"));
    // mtime = now, well under the 60s minimum age.
    fs::write(harness.config.watch_dir.join("fresh.mkv"), b"payload").expect("write");

    let run = completed(harness.run().await);

    assert_eq!(run.outcome, RunOutcome::NoFiles);
    assert!(!harness.dispatched(), "no subordinate may be started");
    assert!(
        !harness.config.lock_file.exists(),
        "no lock may be written for a skipped run"
    );
    assert!(harness.outbox.take().is_empty(), "no notification for skips");
}

#[tokio::test]
async fn scenario_c_stale_lock_is_replaced_and_run_proceeds() {
    let harness = Harness::new("exit 0", None);
    harness.add_old_file("show.mkv");
    fs::write(&harness.config.lock_file, format!("{DEAD_PID}\n")).expect("seed stale lock");

    let run = completed(harness.run().await);

    assert_eq!(run.outcome, RunOutcome::Success);
    assert!(harness.dispatched());
    assert!(!harness.config.lock_file.exists());
}

#[tokio::test]
async fn scenario_d_exit_two_reports_failure_with_error_detail() {
    let harness = Harness::new(
        "echo 'connecting to 10.0.0.9' >&2\n\
         echo 'connection refused' >&2\n\
         exit 2",
        Some("ops@example.net"),
    );
    harness.add_old_file("show.mkv");

    let result = harness.run().await;
    assert_eq!(exit_code(&result), 2, "subordinate exit code propagates");
    let run = completed(result);

    assert_eq!(run.outcome, RunOutcome::Failure);
    assert_eq!(run.error.as_deref(), Some("connection refused"));
    assert!(!harness.config.lock_file.exists());

    let sent = harness.outbox.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "tivowatch: transfer FAILED");
    assert!(sent[0].body_html.contains("connection refused"));
    assert!(sent[0].body_html.contains("show.mkv"));
}

#[tokio::test]
async fn scenario_e_no_recipient_still_classifies_success() {
    let harness = Harness::new("exit 0", None);
    harness.add_old_file("show.mkv");

    let run = completed(harness.run().await);

    assert_eq!(run.outcome, RunOutcome::Success);
    assert!(harness.dispatched());
    assert!(harness.outbox.take().is_empty(), "nothing may be sent");
    assert!(!harness.config.lock_file.exists());
}

// ---------------------------------------------------------------------------
// Lock interplay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_lock_owner_skips_run_without_dispatching() {
    let harness = Harness::new("exit 0", Some("ops@example.net"));
    harness.add_old_file("show.mkv");
    // Our own PID is alive, standing in for a concurrent run.
    let own_pid = std::process::id();
    fs::write(&harness.config.lock_file, format!("{own_pid}\n")).expect("seed live lock");

    let result = harness.run().await;
    assert_eq!(exit_code(&result), 0, "benign skip exits zero");
    let run = completed(result);

    assert_eq!(run.outcome, RunOutcome::AlreadyRunning);
    assert!(!harness.dispatched(), "no subordinate while the lock is held");
    assert!(harness.outbox.take().is_empty());
    let contents = fs::read_to_string(&harness.config.lock_file).expect("lock still there");
    assert_eq!(
        contents.trim(),
        own_pid.to_string(),
        "a busy run must not touch the owner's lock"
    );
}

#[tokio::test]
async fn shutdown_mid_transfer_aborts_and_releases_lock() {
    let harness = Harness::new("echo started\nsleep 30", None);
    harness.add_old_file("show.mkv");

    let (tx, mut rx) = broadcast::channel::<()>(1);
    tokio::spawn({
        let tx = tx.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = tx.send(());
        }
    });

    let result = run_once(&harness.config, &harness.mailer, &mut rx).await;

    assert!(matches!(result, RunResult::Aborted));
    assert_eq!(exit_code(&result), 130);
    assert!(
        !harness.config.lock_file.exists(),
        "abort path must still release the lock"
    );
    assert!(
        harness.outbox.take().is_empty(),
        "a half-finished run has no reportable outcome"
    );
}

#[tokio::test]
async fn transfer_output_lands_in_durable_log() {
    let harness = Harness::new("echo 'Start sending \"show.mkv\"'\nexit 0", None);
    harness.add_old_file("show.mkv");

    completed(harness.run().await);

    let logged = fs::read_to_string(&harness.config.log_file).expect("transfer log");
    assert!(logged.contains("Start sending \"show.mkv\""));
}
