//! Shared test utilities for integration and E2E tests.
//!
//! This module provides fixtures that build real, local git repositories in a
//! temporary directory, so the merge and patch flows can run against the
//! system `git` without any network access.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     let source = fixture.repo("sources/a", &[("a.txt", "a")]);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::should_skip_network_tests;
    #[allow(unused_imports)]
    pub use super::{git, git_output};
    pub use super::TestFixture;
}

/// Author and committer identity used by every git process in the tests.
pub const GIT_IDENTITY: [(&str, &str); 4] = [
    ("GIT_AUTHOR_NAME", "git-glue tests"),
    ("GIT_AUTHOR_EMAIL", "tests@git-glue.invalid"),
    ("GIT_COMMITTER_NAME", "git-glue tests"),
    ("GIT_COMMITTER_EMAIL", "tests@git-glue.invalid"),
];

static IDENTITY: Once = Once::new();

/// Export the test identity into this process's environment so that git
/// commands spawned by the library can commit.
pub fn configure_git_identity() {
    IDENTITY.call_once(|| {
        for (key, value) in GIT_IDENTITY {
            env::set_var(key, value);
        }
    });
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// Run git in `dir`, panicking with its output when it fails.
pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(GIT_IDENTITY)
        .output()
        .expect("Failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run git in `dir` and return its trimmed stdout.
pub fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(GIT_IDENTITY)
        .output()
        .expect("Failed to spawn git");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A test fixture that provides a temporary directory holding local git
/// repositories and an optional `git-glue.yaml`.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new();
/// let target = fixture.repo("target", &[("README.md", "target")]);
/// let source = fixture.repo("sources/a", &[("a.txt", "a")]);
/// fixture.write_config(&target, &[(&source, "lib/a")]);
///
/// fixture.command_with_config().arg("glue").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a git repository at `path` with one commit holding `files`.
    ///
    /// The commit message is `Add <first file>`.
    pub fn repo(&self, path: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.temp_dir.path().join(path);
        std::fs::create_dir_all(&dir).expect("Failed to create repository directory");
        git(&dir, &["init", "--quiet"]);
        git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&dir, &["config", "commit.gpgsign", "false"]);
        for (name, content) in files {
            self.temp_dir
                .child(path)
                .child(name)
                .write_str(content)
                .expect("Failed to write file");
        }
        git(&dir, &["add", "--all"]);
        let message = format!("Add {}", files.first().map(|(n, _)| *n).unwrap_or("nothing"));
        git(&dir, &["commit", "--quiet", "--allow-empty", "-m", message.as_str()]);
        dir
    }

    /// Write `git-glue.yaml` merging `sources` into `target`.
    pub fn write_config(&self, target: &Path, sources: &[(&Path, &str)]) {
        let mut content = format!(
            "workingDir: {}\nworkingBranch: git-glue\ntargetRepo: {}\nsourceRepos:\n",
            self.working_dir().display(),
            target.display()
        );
        for (url, subdirectory) in sources {
            content.push_str(&format!("  {}: {}\n", url.display(), subdirectory));
        }
        self.with_config(&content);
    }

    /// Add a `git-glue.yaml` configuration file with the given content.
    pub fn with_config(&self, content: &str) -> &Self {
        self.temp_dir
            .child("git-glue.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The scratch directory used as `workingDir`.
    pub fn working_dir(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("git-glue.yaml")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("git-glue");
        cmd.current_dir(self.path())
            .envs(GIT_IDENTITY)
            .env_remove("GIT_GLUE_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Create a command with the config file path argument.
    #[allow(dead_code)]
    pub fn command_with_config(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
