//! # workflow-sync CLI
//!
//! Binary entry point. Parses arguments with `clap`, installs the logger and
//! hands off to a command. All reconciliation logic lives in the
//! `workflow_sync` library; this binary only loads state, calls into it and
//! prints results.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
