//! Glue command implementation
//!
//! The glue command rebuilds the target repository from scratch:
//! 1. Delete and re-clone the target, force-creating the working branch
//! 2. For each source, in configuration order: delete and re-clone it,
//!    relocate its content into the configured subdirectory, commit, and
//!    pull it into the target with its history
//!
//! The result is left in the target's clone inside the working directory;
//! nothing is pushed.

use anyhow::Result;
use clap::Args;
use std::time::Instant;

use crate::cli::GlobalOptions;
use git_glue::config::from_file;
use git_glue::glue::MergeOrchestrator;
use git_glue::output::emoji;
use git_glue::progress::{ProgressReporter, SilentProgress, TerminalProgress};

/// Arguments for the glue command
#[derive(Args, Debug)]
pub struct GlueArgs {
    /// Suppress the progress bar and the summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the glue command
pub fn execute(args: GlueArgs, globals: &GlobalOptions) -> Result<()> {
    let start_time = Instant::now();
    let out = &globals.output;

    let config = from_file(&globals.config)?;
    let settings = config.glue_settings()?;

    let mut progress: Box<dyn ProgressReporter> = if out.show_progress(args.quiet) {
        Box::new(TerminalProgress::new())
    } else {
        Box::new(SilentProgress)
    };

    let orchestrator = MergeOrchestrator::new();
    let target = orchestrator.merge(&settings, &mut *progress)?;

    if !args.quiet {
        println!(
            "{} Merged {} repositories into {} in {:.2}s",
            emoji(out, "✅", "[OK]"),
            target.merged.len(),
            target.url,
            start_time.elapsed().as_secs_f64()
        );
        for source in &target.merged {
            println!("   {} -> {}", source.spec.url, source.spec.subdirectory);
        }
        println!(
            "   Result in: {} (branch {})",
            target.working_copy.directory().display(),
            settings.working_branch
        );
    }

    Ok(())
}
