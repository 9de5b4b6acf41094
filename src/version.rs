//! # Git Version Compatibility
//!
//! Git 2.9 started refusing to merge two histories that share no common
//! ancestor unless `--allow-unrelated-histories` is passed. Every merge
//! `git-glue` performs is exactly such a merge, so the pull step needs the
//! flag on the affected git versions.
//!
//! ## Process
//!
//! 1.  **Detection**: The self-reported version text of git (e.g.
//!     `git version 2.39.2 (Apple Git-143)`) is scanned for the first dotted
//!     triple of digits.
//!
//! 2.  **Matching**: The triple is matched against a semver requirement, by
//!     default `>=2.9.0, <3.0.0`. The requirement comes from the configuration
//!     so it can follow git's behaviour without a new release.
//!
//! 3.  **Flags**: A match adds [`MergeFlag::AllowUnrelatedHistories`]. Text
//!     without a recognizable version yields no flags rather than an error.

use regex::Regex;
use semver::{Version, VersionReq};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Extra options for the history-preserving pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MergeFlag {
    /// Merge histories that have no common ancestor.
    AllowUnrelatedHistories,
}

impl MergeFlag {
    /// The command line option git understands for this flag.
    pub fn as_arg(&self) -> &'static str {
        match self {
            MergeFlag::AllowUnrelatedHistories => "--allow-unrelated-histories",
        }
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("version pattern is a valid regex")
    })
}

/// Extract the first `major.minor.patch` triple found anywhere in `text`.
pub fn parse_tool_version(text: &str) -> Option<Version> {
    let captures = version_pattern().captures(text)?;
    let part = |i: usize| captures.get(i)?.as_str().parse::<u64>().ok();
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Decide which merge flags the pull needs for a given git version text.
pub fn merge_flags_for(tool_version: &str, requirement: &VersionReq) -> BTreeSet<MergeFlag> {
    let mut flags = BTreeSet::new();
    match parse_tool_version(tool_version) {
        Some(version) if requirement.matches(&version) => {
            flags.insert(MergeFlag::AllowUnrelatedHistories);
        }
        Some(_) => {}
        None => {
            log::debug!(
                "Could not detect a version in {:?}; merging without extra flags",
                tool_version
            );
        }
    }
    flags
}
