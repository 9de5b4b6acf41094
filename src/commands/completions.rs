//! Completions command implementation
//!
//! Prints a completion script for `glue`, `apply-patch` and the global
//! `--config`/`--log-level`/`--color` flags. The script is written to stdout:
//!
//! ```bash
//! git-glue completions bash > ~/.local/share/bash-completion/completions/git-glue
//! git-glue completions fish > ~/.config/fish/completions/git-glue.fish
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::Shell;
use std::io::{self, Write};

use crate::cli::Cli;

/// Arguments for the completions command
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for
    #[arg(value_enum, value_name = "SHELL")]
    pub shell: Shell,
}

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_script(args.shell, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Render the completion script of `shell` into `out`.
fn write_script(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, out);
    Ok(())
}
