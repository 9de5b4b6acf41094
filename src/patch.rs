//! # Patch Router
//!
//! Applies a patch that was made against one of the original source
//! repositories to the merged target repository. Since every source now
//! lives in a subdirectory, the paths in the patch must be prefixed with that
//! subdirectory, which `git am --directory=<prefix>` does.
//!
//! ## Routing
//!
//! The prefix is resolved in this order:
//!
//! 1.  An explicit directory given by the user is used verbatim.
//! 2.  Otherwise the name of the repository the patch came from is inferred
//!     from the patch **URL** (not its content). The first matching pattern
//!     wins:
//!     - `.../<repo>/pull/...` (pull request patches)
//!     - `.../<repo>/compare/...` (comparison patches)
//!     - `.../<repo>/commit/...` (single commit patches)
//! 3.  The inferred name is looked up in a [`PatchRoutingTable`] built from
//!     the configured sources, keyed by their repository names.
//! 4.  If nothing matches, the prefix is empty and the patch applies at the
//!     repository root. This is logged, not treated as an error.
//!
//! ## Applying
//!
//! The patch is downloaded into a temporary file, the target working copy is
//! resolved (reusing the clone a previous `glue` run left behind, cloning it
//! if needed, or falling back to the current directory) and `git am` runs
//! against it. Git's output is passed through unchanged.

use crate::config::{normalize_subdirectory, Config, RepositorySpec};
use crate::error::{Error, Result};
use crate::filesystem::{FileOperations, HostFilesystem};
use crate::git::repository_name;
use crate::repository::{GitOperations, SystemGit, WorkingCopy, WorkspaceLayout};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Maps a short repository name to the subdirectory it was merged into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchRoutingTable {
    entries: HashMap<String, String>,
}

impl PatchRoutingTable {
    /// Build the table from the configured sources.
    ///
    /// Subdirectories are normalized the same way `glue` normalizes them;
    /// sources with an invalid subdirectory are left out. When two sources
    /// share a repository name the later one wins.
    pub fn from_sources(sources: &[RepositorySpec]) -> Self {
        let entries = sources
            .iter()
            .filter_map(|spec| match normalize_subdirectory(&spec.subdirectory) {
                Ok(subdirectory) => Some((repository_name(&spec.url), subdirectory)),
                Err(message) => {
                    warn!(
                        "Ignoring {} for patch routing: invalid subdirectory: {}",
                        spec.url, message
                    );
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// The subdirectory for a repository name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn url_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // each pattern captures exactly the repository name
        [r"/([^/]+)/pull", r"/([^/]+)/compare", r"/([^/]+)/commit"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Infer the name of the repository a patch URL points into.
pub fn infer_repository_name(patch_url: &str) -> Option<String> {
    url_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(patch_url))
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
}

/// Decide the directory prefix for the paths in a patch.
///
/// Returns an empty string when the patch belongs at the repository root.
pub fn route_patch(
    patch_url: &str,
    explicit_dir: Option<&str>,
    table: &PatchRoutingTable,
) -> String {
    if let Some(dir) = explicit_dir.filter(|d| !d.trim().is_empty()) {
        return dir.to_string();
    }

    match infer_repository_name(patch_url) {
        Some(name) => match table.lookup(&name) {
            Some(subdirectory) => subdirectory.to_string(),
            None => {
                warn!(
                    "Repository '{}' of patch {} is not a configured source; applying at the root",
                    name, patch_url
                );
                String::new()
            }
        },
        None => {
            warn!(
                "Could not infer the repository of patch {}; applying at the root",
                patch_url
            );
            String::new()
        }
    }
}

/// Fetch a patch into a temporary file.
///
/// `http(s)://` locations are downloaded. `file://` URLs and plain paths are
/// read from disk. `timeout` bounds the whole download; `None` waits as long
/// as the server does.
pub fn fetch_patch(location: &str, timeout: Option<Duration>) -> Result<NamedTempFile> {
    let content = match url::Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => download(location, timeout)?,
        Ok(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| Error::Network {
                url: location.to_string(),
                message: "not a valid local file URL".to_string(),
            })?;
            read_local(location, &path)?
        }
        Ok(url) if url.scheme().len() > 1 => {
            return Err(Error::Network {
                url: location.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        // relative paths and Windows drive letters
        _ => read_local(location, Path::new(location))?,
    };

    let mut file = tempfile::Builder::new()
        .prefix("git-glue-patch")
        .suffix(".patch")
        .tempfile()?;
    file.write_all(&content)?;
    file.flush()?;
    debug!(
        "Stored {} bytes of {} in {}",
        content.len(),
        location,
        file.path().display()
    );
    Ok(file)
}

fn download(location: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let network_error = |message: String| Error::Network {
        url: location.to_string(),
        message,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("git-glue/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    let response = client
        .get(location)
        .send()
        .map_err(|e| network_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(network_error(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .map_err(|e| network_error(e.to_string()))?;
    Ok(bytes.to_vec())
}

fn read_local(location: &str, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::Network {
        url: location.to_string(),
        message: format!("could not read {}: {}", path.display(), e),
    })
}

/// Everything `apply-patch` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// The working copy the patch was applied to.
    pub working_copy: WorkingCopy,
    /// The directory prefix given to `git am`, empty for the root.
    pub prefix: String,
    /// What `git am` printed.
    pub output: String,
}

/// Resolves the target working copy and applies patches to it.
pub struct PatchRouter {
    git: Box<dyn GitOperations>,
    fs: Box<dyn FileOperations>,
}

impl Default for PatchRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchRouter {
    /// A router backed by the system `git` and the host filesystem.
    pub fn new() -> Self {
        Self {
            git: Box::new(SystemGit),
            fs: Box::new(HostFilesystem),
        }
    }

    /// A router with custom git and filesystem implementations.
    pub fn with_operations(git: Box<dyn GitOperations>, fs: Box<dyn FileOperations>) -> Self {
        Self { git, fs }
    }

    /// Find or create the working copy a patch should be applied to.
    ///
    /// With both `targetRepo` and `workingDir` configured this is the clone
    /// inside the working directory, cloned first if it does not exist.
    /// Otherwise `current_dir` is used. A configured working branch is
    /// force-created and checked out.
    pub fn resolve_target(&self, config: &Config, current_dir: &Path) -> Result<WorkingCopy> {
        let directory: PathBuf = match (config.target_repo(), config.working_dir()) {
            (Some(target), Some(working_dir)) => {
                let dir = WorkspaceLayout::default_dir(working_dir, target);
                if !self.fs.exists(&dir) {
                    info!("Cloning {} into {}", target, dir.display());
                    self.git.clone_repository(target, &dir)?;
                }
                dir
            }
            _ => current_dir.to_path_buf(),
        };

        let branch = config.working_branch().map(str::to_string);
        if let Some(branch) = &branch {
            self.git
                .checkout_new_branch(&directory, branch)
                .map_err(|e| {
                    e.for_repository(
                        &directory.display().to_string(),
                        &format!("create branch '{}' in", branch),
                    )
                })?;
        }
        Ok(WorkingCopy::new(directory, branch))
    }

    /// Apply a patch file to a working copy under `prefix`.
    pub fn apply_patch(
        &self,
        working_copy: &WorkingCopy,
        patch: &Path,
        prefix: &str,
    ) -> Result<String> {
        let directory = Some(prefix).filter(|p| !p.is_empty());
        self.git
            .apply_mailbox(working_copy.directory(), patch, directory)
    }

    /// Route, fetch and apply the patch at `patch_url`.
    pub fn apply(
        &self,
        config: &Config,
        patch_url: &str,
        explicit_dir: Option<&str>,
        current_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<PatchOutcome> {
        let table = PatchRoutingTable::from_sources(&config.source_repos);
        let prefix = route_patch(patch_url, explicit_dir, &table);
        info!(
            "Applying {} under '{}'",
            patch_url,
            if prefix.is_empty() { "." } else { prefix.as_str() }
        );

        let patch = fetch_patch(patch_url, timeout)?;
        let working_copy = self.resolve_target(config, current_dir)?;
        let output = self
            .apply_patch(&working_copy, patch.path(), &prefix)
            .map_err(|e| e.for_repository(patch_url, "apply the patch"))?;

        Ok(PatchOutcome {
            working_copy,
            prefix,
            output,
        })
    }
}
