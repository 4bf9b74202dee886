//! tivowatch — watch a directory and auto-transfer media to a TiVo.
//!
//! # Usage
//!
//! ```text
//! tivowatch run [--json]         one run: scan, lock, transfer, notify, exit
//! tivowatch watch                supervised loop on CHECK_INTERVAL
//! tivowatch status               inspect the single-instance lock
//! tivowatch shares list          enumerate shares the transfer client knows
//! tivowatch shares find <path>   which share serves a directory
//! tivowatch logs [--lines N]     tail the transfer log
//! ```
//!
//! All configuration comes from the environment (`TIVO_IP`, `WATCH_DIR`,
//! `CHECK_INTERVAL`, `MIN_FILE_AGE`, `MAIL_TO`, …); every key has a default.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{logs::LogsArgs, run::RunArgs, shares::SharesCommand};

#[derive(Parser, Debug)]
#[command(
    name = "tivowatch",
    version,
    about = "Watch a directory and auto-transfer media files to a TiVo device",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one run and exit (for cron-style scheduling).
    Run(RunArgs),

    /// Run the supervised loop until interrupted.
    Watch,

    /// Show whether a run currently holds the lock.
    Status,

    /// Destination-share tooling backed by the transfer client.
    Shares {
        #[command(subcommand)]
        command: SharesCommand,
    },

    /// Print recent transfer log lines.
    Logs(LogsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Watch => commands::watch::run(),
        Commands::Status => commands::status::run(),
        Commands::Shares { command } => commands::shares::run(command),
        Commands::Logs(args) => args.run(),
    }
}
