//! # git-glue
//!
//! This library merges several independent git repositories into
//! subdirectories of one target repository while preserving the commit history
//! of every source, and applies patches made against a source back onto the
//! right subdirectory of the merged repository. It backs the `git-glue`
//! command-line tool but can be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use git_glue::config::RepositorySpec;
//! use git_glue::patch::{route_patch, PatchRoutingTable};
//! use git_glue::version::{merge_flags_for, MergeFlag};
//!
//! // Which subdirectory does a pull request patch belong to?
//! let table = PatchRoutingTable::from_sources(&[RepositorySpec::new(
//!     "https://github.com/someuser/myrepo",
//!     "modules/myrepo",
//! )]);
//! let prefix = route_patch("https://github.com/owner/myrepo/pull/42.patch", None, &table);
//! assert_eq!(prefix, "modules/myrepo");
//!
//! // Does this git need --allow-unrelated-histories?
//! let req = semver::VersionReq::parse(">=2.9.0, <3.0.0").unwrap();
//! assert!(merge_flags_for("git version 2.9.2", &req).contains(&MergeFlag::AllowUnrelatedHistories));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the working directory, working branch,
//!   target repository and the ordered source-to-subdirectory mapping.
//! - **Git access (`git`, `repository`)**: git primitives behind the
//!   `GitOperations` trait, implemented by spawning the system `git`.
//! - **Filesystem access (`filesystem`)**: the few host filesystem operations
//!   needed, behind the `FileOperations` trait.
//! - **Relocation (`relocate`)**: moving a clone's content into a
//!   subdirectory, even one nested inside the clone's own directories.
//! - **Merge orchestration (`glue`)**: clone, relocate, commit, add remote,
//!   pull, for every source in order.
//! - **Patch routing (`patch`)**: inferring the subdirectory of a patch from
//!   its URL and applying it with `git am`.
//! - **Version policy (`version`)**: choosing merge flags from the git version.
//!
//! ## Execution Flow
//!
//! `glue` deletes and re-clones the target, then for each source deletes and
//! re-clones it, relocates its content, commits, and merges it into the target
//! with a history-preserving pull from the local clone. Everything runs
//! sequentially; each git call finishes before the next starts.

pub mod config;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod glue;
pub mod output;
pub mod patch;
pub mod progress;
pub mod relocate;
pub mod repository;
pub mod version;
