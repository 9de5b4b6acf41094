//! # git-glue CLI
//!
//! This is the binary entry point for the `git-glue` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging.
//! - Executing the appropriate command and turning errors into a non-zero
//!   exit code.
//!
//! All merge and patch logic lives in the `git_glue` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
