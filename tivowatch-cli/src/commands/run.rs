//! `tivowatch run` — one fire-and-exit run.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tivowatch_core::{Config, Run, RunOutcome};
use tivowatch_daemon::{exit_code, init_tracing, run_once_blocking, RunResult};

/// Arguments for `tivowatch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();
        let config = Config::from_env().context("invalid configuration")?;
        let result = run_once_blocking(&config).context("run failed to execute")?;

        match &result {
            RunResult::Completed(run) => {
                if self.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(run)
                            .context("failed to render run summary JSON")?
                    );
                } else {
                    print_summary(run);
                }
            }
            RunResult::Aborted => {
                println!("{}", "run aborted before completion".yellow());
            }
        }

        // Exit status is part of the scheduling contract: 0 for success and
        // benign skips, the subordinate's code (or 70) for failures.
        std::process::exit(exit_code(&result));
    }
}

fn print_summary(run: &Run) {
    let outcome = match run.outcome {
        RunOutcome::Success => "success".green(),
        RunOutcome::Failure => "failure".red(),
        RunOutcome::NoFiles => "no eligible files".dimmed(),
        RunOutcome::AlreadyRunning => "another run is active".yellow(),
    };
    println!("outcome: {outcome} ({} ms)", run.duration_ms);

    for file in &run.files {
        println!("  {}", file.file_name());
    }
    if let Some(share) = &run.share {
        println!("share: {share}");
    }
    if let Some(error) = &run.error {
        println!("error: {}", error.red());
    }
}
