use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::Error;
use crate::version::MergeFlag;

/// Derive the short name of a repository from its URL.
///
/// This is the last path segment with any trailing `/` and `.git` removed.
/// Scp-like URLs (`git@host:owner/repo.git`) and local paths are handled the
/// same way, so `https://github.com/someuser/source1.git`,
/// `git@github.com:someuser/source1` and `/srv/git/source1` all yield
/// `source1`.
pub fn repository_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn describe(args: &[&OsStr]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `git` inside `dir` and fail with the captured stderr on a non-zero exit.
fn run_git(dir: &Path, args: &[&OsStr]) -> Result<Output, Error> {
    let command = describe(args);
    debug!("git {} (in {})", command, dir.display());

    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            url: dir.display().to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // `am` and `pull` report conflicts on stdout
        let message = match (stderr.trim(), stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{}\n{}", out, err),
        };
        return Err(Error::GitCommand {
            command,
            url: dir.display().to_string(),
            stderr: message,
        });
    }

    Ok(output)
}

/// Clone a repository into `target_dir`.
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
pub fn clone(url: &str, target_dir: &Path) -> Result<(), Error> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }

    debug!("git clone {} {}", url, target_dir.display());
    let output = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            message: e.to_string(),
            hint: Some("Make sure git is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Provide helpful error message for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure you have access to the repository. For private repos, ensure an \
                 SSH key is loaded in ssh-agent or git credentials are configured"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr.trim().to_string(),
            hint,
        });
    }

    Ok(())
}

/// Create or reset `branch` at the current checkout and switch to it.
pub fn checkout_new_branch(dir: &Path, branch: &str) -> Result<(), Error> {
    run_git(dir, &[OsStr::new("checkout"), OsStr::new("-B"), OsStr::new(branch)])?;
    Ok(())
}

/// Move `sources` into `destination` with `git mv -k`.
///
/// `-k` skips entries git refuses to move (e.g. a directory into itself)
/// instead of failing the whole command.
pub fn move_paths(dir: &Path, sources: &[String], destination: &str) -> Result<(), Error> {
    let mut args: Vec<&OsStr> = vec![OsStr::new("mv"), OsStr::new("-k")];
    args.extend(sources.iter().map(|s| OsStr::new(s.as_str())));
    args.push(OsStr::new(destination));
    run_git(dir, &args)?;
    Ok(())
}

/// Commit everything that is staged.
pub fn commit(dir: &Path, message: &str) -> Result<(), Error> {
    run_git(dir, &[OsStr::new("commit"), OsStr::new("-m"), OsStr::new(message)])?;
    Ok(())
}

/// Register `address` as remote `name`.
pub fn add_remote(dir: &Path, name: &str, address: &Path) -> Result<(), Error> {
    run_git(
        dir,
        &[
            OsStr::new("remote"),
            OsStr::new("add"),
            OsStr::new(name),
            address.as_os_str(),
        ],
    )?;
    Ok(())
}

/// Point an existing remote at a new address.
pub fn set_remote_url(dir: &Path, name: &str, address: &Path) -> Result<(), Error> {
    run_git(
        dir,
        &[
            OsStr::new("remote"),
            OsStr::new("set-url"),
            OsStr::new(name),
            address.as_os_str(),
        ],
    )?;
    Ok(())
}

/// Pull `branch` of `remote` into the current branch as a merge commit.
pub fn pull(dir: &Path, remote: &str, branch: &str, flags: &[MergeFlag]) -> Result<(), Error> {
    let mut args: Vec<&OsStr> = vec![
        OsStr::new("pull"),
        OsStr::new("--no-ff"),
        OsStr::new("--no-edit"),
    ];
    args.extend(flags.iter().map(|f| OsStr::new(f.as_arg())));
    args.push(OsStr::new(remote));
    args.push(OsStr::new(branch));
    run_git(dir, &args)?;
    Ok(())
}

/// Apply a mailbox formatted patch with `git am`.
///
/// When `directory` is given every path in the patch is prefixed with it.
/// Returns git's standard output.
pub fn apply_mailbox(dir: &Path, patch: &Path, directory: Option<&str>) -> Result<String, Error> {
    let directory_arg = directory.map(|d| format!("--directory={}", d));
    let mut args: Vec<&OsStr> = vec![OsStr::new("am")];
    if let Some(arg) = &directory_arg {
        args.push(OsStr::new(arg));
    }
    args.push(patch.as_os_str());
    let output = run_git(dir, &args)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The self-reported version text of the git binary, e.g. `git version 2.39.2`.
pub fn version() -> Result<String, Error> {
    let output = Command::new("git")
        .arg("--version")
        .output()
        .map_err(|e| Error::GitCommand {
            command: "--version".to_string(),
            url: String::new(),
            stderr: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
