//! Moving the whole content of a clone into a subdirectory.
//!
//! A direct `git mv * <subdir>` breaks when the subdirectory is nested inside
//! one of the clone's own top-level entries: moving `src` to `src/subdir`
//! would move a directory into itself. The content is therefore moved in two
//! steps. Every top-level entry first goes into a fresh staging directory,
//! then the staging directory is renamed to the final subdirectory once its
//! parents exist.

use crate::error::{Error, Result};
use crate::filesystem::FileOperations;
use crate::repository::GitOperations;
use log::debug;
use std::path::Path;

/// Base name of the staging directory.
pub const STAGING_DIR: &str = ".git-glue-staging";

const METADATA_DIR: &str = ".git";

/// Pick a staging name that collides neither with an existing entry nor with
/// the first component of `subdirectory`.
pub fn staging_name(entries: &[String], subdirectory: &str) -> String {
    let first_component = subdirectory.split('/').next().unwrap_or_default();
    let mut candidate = STAGING_DIR.to_string();
    let mut n = 2;
    while candidate == first_component || entries.iter().any(|e| *e == candidate) {
        candidate = format!("{}-{}", STAGING_DIR, n);
        n += 1;
    }
    candidate
}

/// Top-level entries of a clone that belong to its content.
pub fn content_entries(fs: &dyn FileOperations, clone_dir: &Path) -> Result<Vec<String>> {
    Ok(fs
        .list_entries(clone_dir)?
        .into_iter()
        .filter(|e| e != METADATA_DIR && e != "." && e != "..")
        .collect())
}

/// Move every top-level entry of `clone_dir` under `subdirectory`.
///
/// Returns the entries that were moved. The moves are staged in git but not
/// committed.
pub fn relocate(
    git: &dyn GitOperations,
    fs: &dyn FileOperations,
    clone_dir: &Path,
    subdirectory: &str,
) -> Result<Vec<String>> {
    let entries = content_entries(fs, clone_dir)?;
    if entries.is_empty() {
        debug!("{} has no content to relocate", clone_dir.display());
        return Ok(entries);
    }

    let staging = staging_name(&entries, subdirectory);
    let staging_path = clone_dir.join(&staging);
    fs.create_dir_all(&staging_path)?;
    git.move_paths(clone_dir, &entries, &staging)?;

    let destination = clone_dir.join(subdirectory);
    if let Some(parent) = destination.parent() {
        if !fs.exists(parent) {
            fs.create_dir_all(parent)?;
        }
    }
    git.move_paths(clone_dir, std::slice::from_ref(&staging), subdirectory)?;

    if fs.exists(&staging_path) || !fs.exists(&destination) {
        return Err(Error::Filesystem {
            path: staging_path,
            message: format!("could not move staged content to {}", subdirectory),
        });
    }

    debug!(
        "Relocated {} entries of {} into {}",
        entries.len(),
        clone_dir.display(),
        subdirectory
    );
    Ok(entries)
}
