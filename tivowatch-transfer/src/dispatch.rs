//! Transfer dispatcher — run the external transfer client as a supervised
//! subordinate process.
//!
//! The client is invoked as `<transfer_cmd> <device> <sequence>` with the
//! destination share passed through the `TIVO_SHARE` environment variable
//! (newer clients read it; older ones ignore it and use their own config).
//!
//! Output is streamed, not buffered: a single read loop consumes stdout and
//! stderr line-wise, logging each line, appending it to the durable
//! transfer log, and accumulating it on the job for later notification
//! composition. The loop also listens for shutdown so an external
//! termination forward-kills the subordinate instead of orphaning it.
//!
//! There is no internal retry and no timeout here: a failed dispatch is
//! retried only by the next scheduled tick, and transfer duration is
//! bounded only by the lock being held.

use std::process::Stdio;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;

use tivowatch_core::{Config, ShareName, TransferJob};

use crate::transfer_log::TransferLog;

/// Environment variable carrying the destination share to the client.
pub const SHARE_ENV_VAR: &str = "TIVO_SHARE";

/// Result of supervising one transfer-client invocation.
#[derive(Debug)]
pub enum Dispatch {
    /// The subordinate ran to exit (including non-zero exit and
    /// failure-to-start — both are classified by the caller).
    Completed(TransferJob),
    /// Shutdown arrived mid-transfer; the subordinate was killed and the
    /// run has no reportable outcome.
    Aborted,
}

/// Spawn the transfer client and supervise it to completion.
pub async fn dispatch(
    config: &Config,
    share: &ShareName,
    log: &TransferLog,
    shutdown: &mut broadcast::Receiver<()>,
) -> Dispatch {
    let started_at = Utc::now();
    let mut job = TransferJob {
        device: config.device.clone(),
        share: share.clone(),
        started_at,
        ended_at: started_at,
        lines: Vec::new(),
        exit_code: None,
        spawn_error: None,
    };

    tracing::info!(
        cmd = %config.transfer_cmd.display(),
        device = %config.device,
        sequence = %config.sequence,
        share = %share,
        "dispatching transfer client",
    );

    let spawned = Command::new(&config.transfer_cmd)
        .arg(&config.device.0)
        .arg(&config.sequence.0)
        .env(SHARE_ENV_VAR, &share.0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            tracing::error!(
                cmd = %config.transfer_cmd.display(),
                error = %err,
                "transfer client could not be started",
            );
            job.spawn_error = Some(err.to_string());
            job.ended_at = Utc::now();
            return Dispatch::Completed(job);
        }
    };

    // stdout/stderr were requested piped above, so take() cannot miss.
    let mut stdout_lines = match child.stdout.take() {
        Some(stdout) => BufReader::new(stdout).lines(),
        None => {
            job.spawn_error = Some("stdout pipe unavailable".to_string());
            job.ended_at = Utc::now();
            return Dispatch::Completed(job);
        }
    };
    let mut stderr_lines = match child.stderr.take() {
        Some(stderr) => BufReader::new(stderr).lines(),
        None => {
            job.spawn_error = Some("stderr pipe unavailable".to_string());
            job.ended_at = Utc::now();
            return Dispatch::Completed(job);
        }
    };

    // A closed shutdown channel means no shutdown can ever arrive; stop
    // polling it instead of treating the closure as a termination.
    let mut shutdown_open = true;
    let mut stdout_done = false;
    let mut stderr_done = false;
    while !(stdout_done && stderr_done) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => observe_line(&mut job, log, line),
                    Ok(None) => stdout_done = true,
                    Err(err) => {
                        tracing::warn!(error = %err, "transfer stdout read error");
                        stdout_done = true;
                    }
                }
            }
            line = stderr_lines.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => observe_line(&mut job, log, line),
                    Ok(None) => stderr_done = true,
                    Err(err) => {
                        tracing::warn!(error = %err, "transfer stderr read error");
                        stderr_done = true;
                    }
                }
            }
            received = shutdown.recv(), if shutdown_open => {
                match received {
                    Err(broadcast::error::RecvError::Closed) => shutdown_open = false,
                    _ => return abort(child, job).await,
                }
            }
        }
    }

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            received = shutdown.recv(), if shutdown_open => {
                match received {
                    Err(broadcast::error::RecvError::Closed) => shutdown_open = false,
                    _ => return abort(child, job).await,
                }
            }
        }
    };

    job.ended_at = Utc::now();
    match status {
        Ok(status) => {
            job.exit_code = status.code();
            if status.success() {
                tracing::info!(lines = job.lines.len(), "transfer client completed");
            } else {
                tracing::error!(
                    status = %status,
                    detail = %job.error_detail(),
                    "transfer client failed",
                );
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to collect transfer client exit status");
            job.spawn_error = Some(format!("wait failed: {err}"));
        }
    }

    Dispatch::Completed(job)
}

fn observe_line(job: &mut TransferJob, log: &TransferLog, line: String) {
    tracing::info!(line = %line, "transfer output");
    if let Err(err) = log.append(&line) {
        // Losing a log line must not fail the transfer itself.
        tracing::warn!(error = %err, "could not append to transfer log");
    }
    job.lines.push(line);
}

async fn abort(mut child: tokio::process::Child, mut job: TransferJob) -> Dispatch {
    tracing::warn!("shutdown during transfer, killing subordinate process");
    if let Err(err) = child.kill().await {
        tracing::warn!(error = %err, "failed to kill transfer client");
    }
    job.ended_at = Utc::now();
    Dispatch::Aborted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;
    use tivowatch_core::DeviceAddr;

    fn fake_client(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("pytivo-transfer");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn test_config(dir: &TempDir, client_body: &str) -> (Config, TransferLog) {
        let config = Config {
            device: DeviceAddr::from("10.0.0.9"),
            transfer_cmd: fake_client(dir, client_body),
            log_file: dir.path().join("transfer.log"),
            ..Config::default()
        };
        let log = TransferLog::new(config.log_file.clone());
        (config, log)
    }

    fn shutdown_rx() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
        broadcast::channel(1)
    }

    #[tokio::test]
    async fn successful_client_yields_success_job_with_captured_lines() {
        let dir = TempDir::new().expect("dir");
        let (config, log) = test_config(
            &dir,
            "echo 'Start sending \"a.mkv\"'\necho 'Done sending \"a.mkv\"'\nexit 0",
        );
        let (_tx, mut rx) = shutdown_rx();

        let result = dispatch(&config, &ShareName::from("tivo-importer"), &log, &mut rx).await;
        let Dispatch::Completed(job) = result else {
            panic!("expected completed job");
        };

        assert!(job.succeeded());
        assert_eq!(job.exit_code, Some(0));
        assert_eq!(
            job.lines,
            vec!["Start sending \"a.mkv\"", "Done sending \"a.mkv\""]
        );

        let logged = fs::read_to_string(log.path()).expect("read log");
        assert!(logged.contains("Start sending \"a.mkv\""));
        assert!(logged.contains("Done sending \"a.mkv\""));
    }

    #[tokio::test]
    async fn nonzero_exit_yields_failure_with_last_line_detail() {
        let dir = TempDir::new().expect("dir");
        let (config, log) = test_config(
            &dir,
            "echo 'connecting to device' >&2\necho 'connection refused' >&2\nexit 2",
        );
        let (_tx, mut rx) = shutdown_rx();

        let result = dispatch(&config, &ShareName::from("tivo-importer"), &log, &mut rx).await;
        let Dispatch::Completed(job) = result else {
            panic!("expected completed job");
        };

        assert!(!job.succeeded());
        assert_eq!(job.exit_code, Some(2));
        assert_eq!(job.error_detail(), "connection refused");
    }

    #[tokio::test]
    async fn unstartable_client_is_a_completed_failure() {
        let dir = TempDir::new().expect("dir");
        let (mut config, log) = test_config(&dir, "exit 0");
        config.transfer_cmd = PathBuf::from("/definitely/not/a/binary");
        let (_tx, mut rx) = shutdown_rx();

        let result = dispatch(&config, &ShareName::from("tivo-importer"), &log, &mut rx).await;
        let Dispatch::Completed(job) = result else {
            panic!("expected completed job");
        };

        assert!(!job.succeeded());
        assert!(job.spawn_error.is_some());
        assert!(job.error_detail().contains("could not be started"));
    }

    #[tokio::test]
    async fn shutdown_mid_transfer_aborts_and_kills_subordinate() {
        let dir = TempDir::new().expect("dir");
        let (config, log) = test_config(&dir, "echo 'Start sending \"a.mkv\"'\nsleep 30");
        let (tx, mut rx) = shutdown_rx();

        let started = Instant::now();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });

        let result = dispatch(&config, &ShareName::from("tivo-importer"), &log, &mut rx).await;
        handle.await.expect("signal task");

        assert!(matches!(result, Dispatch::Aborted));
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "abort must not wait out the subordinate's sleep"
        );
    }
}
