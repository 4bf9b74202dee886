//! Runtime entrypoints for the two deployment modes.
//!
//! Fire-and-exit (`run_once_blocking`) executes a single run and returns
//! its result for exit-status mapping; the supervised loop
//! (`watch_blocking`) repeats runs on the configured interval until told
//! to stop. Both install a listener for SIGINT and SIGTERM so an external
//! termination during monitoring forward-kills the subordinate and still
//! releases the lock.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use tivowatch_core::Config;
use tivowatch_notify::{Mailer, SmtpMailer};

use crate::error::DaemonError;
use crate::run::{self, RunResult};

/// Execute one run on a fresh runtime and return its result.
pub fn run_once_blocking(config: &Config) -> Result<RunResult, DaemonError> {
    let runtime = build_runtime()?;
    runtime.block_on(async {
        let mailer = smtp_mailer(config);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(4);
        spawn_signal_listener(shutdown_tx);
        Ok(run::run_once(config, &mailer, &mut shutdown_rx).await)
    })
}

/// Run the supervised loop and block the current thread until shutdown.
pub fn watch_blocking(config: &Config) -> Result<(), DaemonError> {
    let runtime = build_runtime()?;
    runtime.block_on(watch(config.clone()))
}

/// The supervised loop: one run per interval tick, shutdown on signal.
pub async fn watch(config: Config) -> Result<(), DaemonError> {
    log_startup_banner(&config);

    let mailer = smtp_mailer(&config);
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(4);
    spawn_signal_listener(shutdown_tx.clone());

    let mut interval = tokio::time::interval(config.check_interval);
    // Late ticks (a transfer can outlast the interval) must not burst.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            // First tick fires immediately: the service checks on start,
            // then every interval.
            _ = interval.tick() => {
                let mut run_shutdown = shutdown_tx.subscribe();
                match run::run_once(&config, &mailer, &mut run_shutdown).await {
                    RunResult::Aborted => break,
                    RunResult::Completed(run) => {
                        tracing::info!(
                            outcome = %run.outcome,
                            files = run.files.len(),
                            duration_ms = run.duration_ms,
                            "run finished",
                        );
                    }
                }
            }
        }
    }

    tracing::info!("watch loop stopped");
    Ok(())
}

fn build_runtime() -> Result<tokio::runtime::Runtime, DaemonError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| DaemonError::Runtime(format!("failed to build tokio runtime: {e}")))
}

fn smtp_mailer(config: &Config) -> Arc<dyn Mailer> {
    Arc::new(SmtpMailer::new(config.mail.clone()))
}

/// SIGINT and SIGTERM both feed the shutdown channel: a service-manager
/// stop must release the lock and kill the subordinate the same way an
/// interactive ctrl-c does.
fn spawn_signal_listener(shutdown_tx: broadcast::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "could not install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("received ctrl-c, shutting down"),
                Err(err) => {
                    tracing::error!(error = %err, "ctrl-c handler failed");
                    return;
                }
            },
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
        let _ = shutdown_tx.send(());
    });
}

fn log_startup_banner(config: &Config) {
    tracing::info!("tivowatch starting");
    tracing::info!(device = %config.device, "target device");
    tracing::info!(watch_dir = %config.watch_dir.display(), "watch directory");
    tracing::info!(
        check_interval_secs = config.check_interval.as_secs(),
        min_file_age_secs = config.min_file_age.as_secs(),
        sequence = %config.sequence,
        "schedule",
    );
    tracing::info!(
        lock_file = %config.lock_file.display(),
        log_file = %config.log_file.display(),
        "paths",
    );
    match &config.mail.to {
        Some(to) => tracing::info!(recipient = %to, "notifications enabled"),
        None => tracing::info!("no recipient configured, notifications disabled"),
    }
}

/// Install the global tracing subscriber; safe to call more than once.
/// Logs go to stderr: stdout is reserved for command output such as the
/// `run --json` summary.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
