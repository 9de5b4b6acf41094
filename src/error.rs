//! # Error Handling
//!
//! This module defines the centralized error type for `git-glue`. It uses the
//! `thiserror` library to build a single `Error` enum that every library
//! function returns, so the merge orchestrator, the patch router and the git
//! layer all report failures through the same taxonomy.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum covering every anticipated failure mode. Each
//!   variant carries the context a user needs to locate the problem, most
//!   importantly the repository or patch URL involved.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants map onto the kinds of failure the tool can run into:
//!
//! - Configuration errors (missing or malformed keys).
//! - Network errors (clone, pull or patch download failures).
//! - Git command failures (checkout, move, commit, merge, am rejected by git).
//! - Filesystem errors (remove, mkdir, permission or space issues).
//! - Wrapped library errors (I/O, YAML, TOML, regex, URL, semver, HTTP).
//!
//! Failures inside the merge loop are wrapped in `Error::Repository` so the
//! final message always names the offending repository and operation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for git-glue operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is missing a required key or holds an invalid value.
    ///
    /// This error includes the specific issue and optionally a hint about how
    /// to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// Git ran but rejected the requested operation.
    ///
    /// `url` is the repository the command ran against; for commands run inside
    /// a working copy this is the working copy's directory.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// A step of the merge failed for a specific repository.
    #[error("Failed to {operation} {url}")]
    Repository {
        url: String,
        operation: String,
        #[source]
        source: Box<Error>,
    },

    /// An error occurred with a filesystem operation on the host.
    #[error("Filesystem operation error: {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    /// An error occurred during a network operation.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Wrap this error with the repository URL and the step that failed.
    pub fn for_repository(self, url: &str, operation: &str) -> Self {
        Error::Repository {
            url: url.to_string(),
            operation: operation.to_string(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a configuration error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
