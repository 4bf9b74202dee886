//! `tivowatch shares` — destination-share tooling over the transfer client.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tabled::{Table, Tabled};

use tivowatch_core::Config;
use tivowatch_transfer::resolver;

#[derive(Subcommand, Debug)]
pub enum SharesCommand {
    /// Enumerate every share the transfer client knows.
    List,
    /// Show which share is configured for a directory.
    Find {
        /// Directory to look up (defaults to the configured watch directory).
        path: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct ShareRow {
    #[tabled(rename = "Share")]
    name: String,
}

pub fn run(command: SharesCommand) -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    match command {
        SharesCommand::List => {
            let shares = resolver::list_shares(&config).context("could not list shares")?;
            if shares.is_empty() {
                println!("no shares configured");
                return Ok(());
            }
            let rows: Vec<ShareRow> = shares
                .into_iter()
                .map(|share| ShareRow { name: share.0 })
                .collect();
            println!("{}", Table::new(rows));
        }
        SharesCommand::Find { path } => {
            let path = path.unwrap_or_else(|| config.watch_dir.clone());
            match resolver::find_share(&config, &path).context("share lookup failed")? {
                Some(share) => println!("{share}"),
                None => println!(
                    "no share matches {} (runs would fall back to '{}')",
                    path.display(),
                    resolver::DEFAULT_SHARE
                ),
            }
        }
    }

    Ok(())
}
