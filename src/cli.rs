//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use git_glue::config::DEFAULT_CONFIG_FILE;
use git_glue::output::OutputConfig;

/// git-glue - Merge git repositories into subdirectories of one repository
#[derive(Parser, Debug)]
#[command(name = "git-glue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(
        short,
        long,
        global = true,
        value_name = "PATH",
        env = "GIT_GLUE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge the configured source repositories into the target repository
    Glue(commands::glue::GlueArgs),

    /// Apply a patch to the subdirectory of the repository it was made for
    ApplyPatch(commands::apply_patch::ApplyPatchArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Global options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: PathBuf,
    pub output: OutputConfig,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let globals = GlobalOptions {
            config: self.config,
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Glue(args) => commands::glue::execute(args, &globals),
            Commands::ApplyPatch(args) => commands::apply_patch::execute(args, &globals),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Initialize env_logger at `level`; a `RUST_LOG` value overrides it.
fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format_timestamp(None);
    // Already initialized when run more than once in a process
    let _ = builder.try_init();
}
