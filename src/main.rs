//! Hashsentry CLI: enable scanning for a root, advance it from cron with `tick`, review changes.

use anyhow::Result;
use clap::Parser;
use hashsentry::engine::arg_parser::Cli;
use hashsentry::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
