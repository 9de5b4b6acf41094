//! # Host Filesystem Access
//!
//! The merge orchestrator touches the host filesystem in only a handful of
//! ways: wiping a stale clone, creating directories for relocated paths,
//! checking whether a path exists and listing the top-level entries of a
//! clone. Those operations sit behind the [`FileOperations`] trait so the
//! orchestration logic can be tested against a fake without touching disk.
//!
//! [`HostFilesystem`] is the real implementation, backed by `std::fs`. Its
//! errors are reported as [`Error::Filesystem`] with the offending path.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Trait for filesystem operations - allows mocking in tests
pub trait FileOperations {
    /// Recursively remove `path`. A missing path is not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Create `path` and all of its missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Names of the entries directly inside `dir`, sorted.
    ///
    /// `.` and `..` are never included.
    fn list_entries(&self, dir: &Path) -> Result<Vec<String>>;
}

/// `FileOperations` on the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFilesystem;

fn fs_error(path: &Path, err: std::io::Error) -> Error {
    Error::Filesystem {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

impl FileOperations for HostFilesystem {
    fn remove_all(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map_err(|e| fs_error(path, e)),
            Ok(_) => fs::remove_file(path).map_err(|e| fs_error(path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_error(path, e)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| fs_error(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| fs_error(dir, e))? {
            let entry = entry.map_err(|e| fs_error(dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
