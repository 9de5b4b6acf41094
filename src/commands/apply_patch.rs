//! Apply-patch command implementation
//!
//! Applies a patch made against one of the source repositories to the merged
//! repository, under the subdirectory that source was merged into. The
//! subdirectory comes from `--dir` when given, otherwise it is inferred from
//! the repository name in the patch URL (`/<name>/pull`, `/<name>/compare` or
//! `/<name>/commit`). Unmatched patches are applied at the repository root.

use anyhow::Result;
use clap::Args;
use log::info;
use std::time::Duration;

use crate::cli::GlobalOptions;
use git_glue::config::{from_file, Config};
use git_glue::output::emoji;
use git_glue::patch::PatchRouter;

/// Arguments for the apply-patch command
#[derive(Args, Debug)]
pub struct ApplyPatchArgs {
    /// Patch location: an http(s) URL, a file:// URL or a local path
    #[arg(value_name = "URL")]
    pub url: String,

    /// Subdirectory to apply the patch under, bypassing inference
    #[arg(short, long, value_name = "PATH")]
    pub dir: Option<String>,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Execute the apply-patch command
pub fn execute(args: ApplyPatchArgs, globals: &GlobalOptions) -> Result<()> {
    // Every key is optional here, so a missing file means an empty configuration
    let config = if globals.config.exists() {
        from_file(&globals.config)?
    } else {
        info!(
            "No configuration at {}, applying in the current directory",
            globals.config.display()
        );
        Config::default()
    };

    let current_dir = std::env::current_dir()?;
    let router = PatchRouter::new();
    let outcome = router.apply(
        &config,
        &args.url,
        args.dir.as_deref(),
        &current_dir,
        args.timeout.map(Duration::from_secs),
    )?;

    print!("{}", outcome.output);
    if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
        println!();
    }
    let location = if outcome.prefix.is_empty() {
        "the repository root".to_string()
    } else {
        outcome.prefix.clone()
    };
    println!(
        "{} Applied {} under {} in {}",
        emoji(&globals.output, "✅", "[OK]"),
        args.url,
        location,
        outcome.working_copy.directory().display()
    );

    Ok(())
}
