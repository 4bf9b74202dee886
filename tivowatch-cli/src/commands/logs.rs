//! `tivowatch logs` — tail the durable transfer log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use clap::Args;

use tivowatch_core::Config;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,
}

impl LogsArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        let path = &config.log_file;

        if !path.exists() {
            println!("log file not found: {}", path.display());
            return Ok(());
        }

        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut tail = VecDeque::<String>::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("read {}", path.display()))?;
            if tail.len() == self.lines {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        for line in tail {
            println!("{line}");
        }
        Ok(())
    }
}
