//! # Repositories and Working Copies
//!
//! This module provides the seam between `git-glue`'s algorithms and the git
//! binary, plus the small value types that describe clones on disk.
//!
//! ## Design
//!
//! - **`GitOperations`**: Defines every git primitive the tool needs (clone,
//!   checkout, move, commit, remote, pull, am, version). `SystemGit` wraps the
//!   functions in [`crate::git`], which spawn the system `git` command. Tests
//!   substitute mock implementations to check the exact sequence of calls
//!   without running git.
//!
//! - **`WorkingCopy`**: A clone bound to one local directory and one branch.
//!   Its directory doubles as the "remote handle" other working copies can
//!   pull from.
//!
//! - **`TargetRepository`**: The working copy every source is merged into,
//!   together with a record of what was merged.
//!
//! - **`WorkspaceLayout`**: Hands out the local directories inside the working
//!   directory, one per repository URL, without two repositories of the same
//!   run ever sharing a directory.

use crate::config::RepositorySpec;
use crate::error::Result;
use crate::version::MergeFlag;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Clones `url` into `target_dir`, which must not exist yet.
    fn clone_repository(&self, url: &str, target_dir: &Path) -> Result<()>;

    /// Creates `branch` at the current checkout, resetting it if it exists,
    /// and switches to it.
    fn checkout_new_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Moves `sources` into `destination`, skipping entries git refuses to
    /// move.
    fn move_paths(&self, dir: &Path, sources: &[String], destination: &str) -> Result<()>;

    /// Commits the staged changes.
    fn commit(&self, dir: &Path, message: &str) -> Result<()>;

    /// Adds a remote called `name` pointing at `address`.
    fn add_remote(&self, dir: &Path, name: &str, address: &Path) -> Result<()>;

    /// Changes the address of an existing remote.
    fn set_remote_url(&self, dir: &Path, name: &str, address: &Path) -> Result<()>;

    /// Pulls `branch` from `remote` into the current branch with a merge
    /// commit.
    fn pull(&self, dir: &Path, remote: &str, branch: &str, flags: &[MergeFlag]) -> Result<()>;

    /// Applies a mailbox patch, prefixing its paths with `directory`.
    /// Returns git's output.
    fn apply_mailbox(&self, dir: &Path, patch: &Path, directory: Option<&str>) -> Result<String>;

    /// The version text git reports about itself.
    fn version(&self) -> Result<String>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGit;

impl GitOperations for SystemGit {
    fn clone_repository(&self, url: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone(url, target_dir)
    }

    fn checkout_new_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        crate::git::checkout_new_branch(dir, branch)
    }

    fn move_paths(&self, dir: &Path, sources: &[String], destination: &str) -> Result<()> {
        crate::git::move_paths(dir, sources, destination)
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        crate::git::commit(dir, message)
    }

    fn add_remote(&self, dir: &Path, name: &str, address: &Path) -> Result<()> {
        crate::git::add_remote(dir, name, address)
    }

    fn set_remote_url(&self, dir: &Path, name: &str, address: &Path) -> Result<()> {
        crate::git::set_remote_url(dir, name, address)
    }

    fn pull(&self, dir: &Path, remote: &str, branch: &str, flags: &[MergeFlag]) -> Result<()> {
        crate::git::pull(dir, remote, branch, flags)
    }

    fn apply_mailbox(&self, dir: &Path, patch: &Path, directory: Option<&str>) -> Result<String> {
        crate::git::apply_mailbox(dir, patch, directory)
    }

    fn version(&self) -> Result<String> {
        crate::git::version()
    }
}

/// A clone on disk with the branch it has checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    directory: PathBuf,
    branch: Option<String>,
}

impl WorkingCopy {
    pub fn new(directory: impl Into<PathBuf>, branch: Option<String>) -> Self {
        Self {
            directory: directory.into(),
            branch,
        }
    }

    /// The directory of the clone.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The branch git-glue switched to, if any.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// The address other working copies use to add this one as a remote.
    pub fn remote_handle(&self) -> &Path {
        &self.directory
    }
}

/// One source that was merged into the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSource {
    pub spec: RepositorySpec,
    /// The local clone of the source.
    pub clone: WorkingCopy,
    /// Top-level entries that were relocated under the subdirectory.
    pub relocated: Vec<String>,
}

/// The working copy all sources were merged into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRepository {
    pub url: String,
    pub working_copy: WorkingCopy,
    pub merged: Vec<MergedSource>,
}

/// Allocates a local directory for each repository of a run.
///
/// Directory names come from [`crate::git::repository_name`]. A name that
/// was already handed out gets a numeric suffix, so a source that happens to
/// share its name with the target (or another source) never wipes a clone
/// this run still needs.
#[derive(Debug)]
pub struct WorkspaceLayout {
    root: PathBuf,
    used: HashSet<String>,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            used: HashSet::new(),
        }
    }

    /// The directory the target repository is cloned into when nothing else
    /// has been allocated.
    pub fn default_dir(root: &Path, url: &str) -> PathBuf {
        root.join(Self::base_name(url))
    }

    fn base_name(url: &str) -> String {
        let name = crate::git::repository_name(url);
        if name.is_empty() {
            "repository".to_string()
        } else {
            name
        }
    }

    /// Reserve a directory for `url`.
    pub fn allocate(&mut self, url: &str) -> PathBuf {
        let base = Self::base_name(url);
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        self.root.join(candidate)
    }
}
