//! # Configuration Schema and Loading
//!
//! This module defines the `git-glue` configuration file and the logic for
//! loading and validating it. A configuration names one target repository, a
//! scratch directory for transient clones, the branch used for intermediate
//! commits, and an ordered mapping of source repository URL to the
//! subdirectory it should end up in:
//!
//! ```yaml
//! workingDir: /tmp/git-glue
//! workingBranch: git-glue
//! targetRepo: https://github.com/someuser/target
//! sourceRepos:
//!   https://github.com/someuser/source1: lib
//!   https://github.com/someuser/source2: src/subdir
//! ```
//!
//! ## Formats
//!
//! YAML is the default format. Files whose name ends in `.toml` are parsed as
//! TOML with the same camelCase keys. In both cases the order of
//! `sourceRepos` is preserved, since merges are applied in that order.
//!
//! ## Validation
//!
//! Every key is optional at parse time because `apply-patch` can run with a
//! partial configuration. The `glue` command calls [`Config::glue_settings`],
//! which enforces the required keys and returns a [`GlueSettings`].

use crate::error::{Error, Result};
use semver::VersionReq;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "git-glue.yaml";

/// Git versions that need `--allow-unrelated-histories` when nothing else is
/// configured. Git 2.9 started refusing to merge histories without a common
/// ancestor.
pub const DEFAULT_UNRELATED_HISTORIES_VERSIONS: &str = ">=2.9.0, <3.0.0";

/// One source repository and the subdirectory it is merged into.
///
/// The URL is the identity of a spec. Several specs may share a subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    /// Clone URL of the source repository.
    pub url: String,
    /// Path inside the target repository, relative to its root.
    pub subdirectory: String,
}

impl RepositorySpec {
    pub fn new(url: impl Into<String>, subdirectory: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subdirectory: subdirectory.into(),
        }
    }
}

/// The configuration file as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Scratch directory holding the transient clones.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Branch created in every clone for the intermediate commits.
    #[serde(default)]
    pub working_branch: Option<String>,
    /// The repository all sources are merged into.
    #[serde(default)]
    pub target_repo: Option<String>,
    /// Source repository URL to target subdirectory, in merge order.
    #[serde(default, deserialize_with = "deserialize_source_repos")]
    pub source_repos: Vec<RepositorySpec>,
    /// Semver requirement selecting the git versions that need
    /// `--allow-unrelated-histories`.
    #[serde(default)]
    pub unrelated_histories_versions: Option<String>,
}

/// A validated configuration for the `glue` command.
#[derive(Debug, Clone)]
pub struct GlueSettings {
    pub working_dir: PathBuf,
    pub working_branch: String,
    pub target_repo: String,
    pub sources: Vec<RepositorySpec>,
    pub unrelated_histories: VersionReq,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// The working directory, if configured and non-empty.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// The working branch, if configured and non-empty.
    pub fn working_branch(&self) -> Option<&str> {
        non_empty(&self.working_branch)
    }

    /// The target repository URL, if configured and non-empty.
    pub fn target_repo(&self) -> Option<&str> {
        non_empty(&self.target_repo)
    }

    /// The version range that triggers `--allow-unrelated-histories`.
    pub fn unrelated_histories_requirement(&self) -> Result<VersionReq> {
        let raw = non_empty(&self.unrelated_histories_versions)
            .unwrap_or(DEFAULT_UNRELATED_HISTORIES_VERSIONS);
        VersionReq::parse(raw).map_err(|e| Error::Config {
            message: format!("Invalid unrelatedHistoriesVersions '{}': {}", raw, e),
            hint: Some("Use a semver requirement such as \">=2.9.0, <3.0.0\"".to_string()),
        })
    }

    /// Validate the configuration for a full merge run.
    pub fn glue_settings(&self) -> Result<GlueSettings> {
        let working_dir = self
            .working_dir()
            .ok_or_else(|| missing_key("workingDir", "workingDir: /tmp/git-glue"))?;
        // clone paths become remote URLs resolved from inside the target clone
        let working_dir = std::path::absolute(working_dir).map_err(|e| Error::Config {
            message: format!(
                "Cannot resolve workingDir '{}': {}",
                working_dir.display(),
                e
            ),
            hint: Some("Use an absolute path such as '/tmp/git-glue'".to_string()),
        })?;
        let working_branch = self
            .working_branch()
            .ok_or_else(|| missing_key("workingBranch", "workingBranch: git-glue"))?
            .to_string();
        let target_repo = self
            .target_repo()
            .ok_or_else(|| {
                missing_key("targetRepo", "targetRepo: https://github.com/someuser/target")
            })?
            .to_string();

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(self.source_repos.len());
        for spec in &self.source_repos {
            if !seen.insert(spec.url.as_str()) {
                return Err(Error::config(format!(
                    "Source repository {} is listed more than once",
                    spec.url
                )));
            }
            let subdirectory = normalize_subdirectory(&spec.subdirectory).map_err(|message| {
                Error::Config {
                    message: format!("Invalid subdirectory for {}: {}", spec.url, message),
                    hint: Some(
                        "Use a relative path inside the target repository, e.g. 'lib'".to_string(),
                    ),
                }
            })?;
            sources.push(RepositorySpec::new(spec.url.clone(), subdirectory));
        }

        Ok(GlueSettings {
            working_dir,
            working_branch,
            target_repo,
            sources,
            unrelated_histories: self.unrelated_histories_requirement()?,
        })
    }
}

fn missing_key(key: &str, example: &str) -> Error {
    Error::Config {
        message: format!("Missing required key '{}'", key),
        hint: Some(format!("Add '{}' to the configuration file", example)),
    }
}

/// Normalize a configured subdirectory to a clean relative path.
///
/// Trailing slashes are dropped. Empty paths, absolute paths and paths that
/// contain `.` or `..` components are rejected.
pub fn normalize_subdirectory(raw: &str) -> std::result::Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("subdirectory must not be empty".to_string());
    }
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir | Component::ParentDir => {
                return Err(format!("'{}' must not contain '.' or '..'", raw));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("'{}' must be a relative path", raw));
            }
        }
    }
    Ok(trimmed.to_string())
}

fn deserialize_source_repos<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<RepositorySpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SourceReposVisitor;

    impl<'de> Visitor<'de> for SourceReposVisitor {
        type Value = Vec<RepositorySpec>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a mapping of repository URL to subdirectory")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut specs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((url, subdirectory)) = map.next_entry::<String, String>()? {
                specs.push(RepositorySpec { url, subdirectory });
            }
            Ok(specs)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_map(SourceReposVisitor)
}

/// Parse a YAML configuration.
pub fn parse(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Parse a TOML configuration.
pub fn parse_toml(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Load a configuration file, picking the parser from the file extension.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Config {
            message: format!("Configuration file not found: {}", path.display()),
            hint: Some(
                "Copy git-glue.sample.yaml to git-glue.yaml or pass --config <PATH>".to_string(),
            ),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        parse_toml(&content)
    } else {
        parse(&content)
    }
}
