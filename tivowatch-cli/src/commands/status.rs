//! `tivowatch status` — inspect the single-instance lock.

use anyhow::{Context, Result};
use colored::Colorize;

use tivowatch_core::Config;
use tivowatch_daemon::lock::{self, LockStatus};

pub fn run() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let status = lock::inspect(&config.lock_file)
        .with_context(|| format!("could not read lock at {}", config.lock_file.display()))?;

    match status {
        LockStatus::Free => {
            println!("{}", "no run active".green());
        }
        LockStatus::Held { pid } => {
            println!("{} (pid {pid})", "run active".yellow());
        }
        LockStatus::Stale { pid: Some(pid) } => {
            println!(
                "{} (pid {pid} is dead; the next run will remove it)",
                "stale lock".red()
            );
        }
        LockStatus::Stale { pid: None } => {
            println!(
                "{} (unparseable contents; the next run will remove it)",
                "stale lock".red()
            );
        }
    }
    println!("lock file: {}", config.lock_file.display());
    Ok(())
}
