//! `tivowatch watch` — supervised loop in the foreground.

use anyhow::{Context, Result};

use tivowatch_core::Config;
use tivowatch_daemon::{init_tracing, watch_blocking};

pub fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("invalid configuration")?;
    watch_blocking(&config).context("watch loop exited with error")
}
