//! # Merge Orchestrator
//!
//! Glues several source repositories into subdirectories of one target
//! repository while keeping the full history of every source. No history is
//! rewritten; each source is merged through a merge commit instead.
//!
//! ## Process
//!
//! 1.  **Target**: Any stale clone of the target is removed, the target is
//!     cloned fresh and the working branch is force-created in it.
//!
//! 2.  **Sources**, in configuration order:
//!     - the source is cloned fresh and the working branch force-created;
//!     - all of its content is moved into the configured subdirectory (see
//!       [`crate::relocate`]) and the move is committed;
//!     - the local clone is added to the target as a remote named after the
//!       subdirectory and its working branch is pulled with `--no-ff`.
//!
//! 3.  **Progress** is reported after the target is ready and after every
//!     source, `sources + 1` steps in total.
//!
//! Any failure aborts the run with the offending repository URL and the step
//! that failed. Whatever was already done stays on disk for inspection; there
//! is no rollback. The next run starts by deleting every clone anyway.

use crate::config::{GlueSettings, RepositorySpec};
use crate::error::Result;
use crate::filesystem::{FileOperations, HostFilesystem};
use crate::progress::ProgressReporter;
use crate::relocate::relocate;
use crate::repository::{
    GitOperations, MergedSource, SystemGit, TargetRepository, WorkingCopy, WorkspaceLayout,
};
use crate::version::{merge_flags_for, MergeFlag};
use log::{info, warn};
use semver::VersionReq;
use std::collections::HashSet;
use std::path::Path;

/// Commit message used for the relocation commit in a source clone.
pub fn relocation_message(spec: &RepositorySpec) -> String {
    format!("Moved {} into subdirectory {}", spec.url, spec.subdirectory)
}

/// Runs the merge of all sources into the target.
pub struct MergeOrchestrator {
    git: Box<dyn GitOperations>,
    fs: Box<dyn FileOperations>,
}

impl Default for MergeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeOrchestrator {
    /// An orchestrator backed by the system `git` and the host filesystem.
    pub fn new() -> Self {
        Self {
            git: Box::new(SystemGit),
            fs: Box::new(HostFilesystem),
        }
    }

    /// An orchestrator with custom git and filesystem implementations.
    pub fn with_operations(git: Box<dyn GitOperations>, fs: Box<dyn FileOperations>) -> Self {
        Self { git, fs }
    }

    /// Flags for the pull step, based on the installed git version.
    ///
    /// A git that cannot report its version gets no flags.
    pub fn merge_flags(&self, requirement: &VersionReq) -> Vec<MergeFlag> {
        let version = match self.git.version() {
            Ok(version) => version,
            Err(e) => {
                warn!("Could not determine the git version: {}", e);
                String::new()
            }
        };
        merge_flags_for(&version, requirement).into_iter().collect()
    }

    /// Merge every configured source into the target repository.
    pub fn merge(
        &self,
        settings: &GlueSettings,
        progress: &mut dyn ProgressReporter,
    ) -> Result<TargetRepository> {
        let branch = settings.working_branch.as_str();
        let mut layout = WorkspaceLayout::new(&settings.working_dir);

        progress.start(settings.sources.len() as u64 + 1);
        progress.message(&format!(
            "Prepare target repository {}",
            settings.target_repo
        ));
        let target_dir = layout.allocate(&settings.target_repo);
        let target = self.fresh_clone(&settings.target_repo, &target_dir, branch)?;
        info!(
            "Prepared target {} in {}",
            settings.target_repo,
            target.directory().display()
        );
        progress.advance();

        let flags = self.merge_flags(&settings.unrelated_histories);
        let mut remotes = HashSet::new();
        let mut merged = Vec::with_capacity(settings.sources.len());

        for spec in &settings.sources {
            progress.message(&format!(
                "Merge source repository {} into {}",
                spec.url, spec.subdirectory
            ));
            let source =
                self.merge_source(&target, spec, &mut layout, branch, &flags, &mut remotes)?;
            merged.push(source);
            progress.advance();
        }

        progress.finish();

        Ok(TargetRepository {
            url: settings.target_repo.clone(),
            working_copy: target,
            merged,
        })
    }

    /// Delete `dir`, clone `url` into it and force-create `branch`.
    fn fresh_clone(&self, url: &str, dir: &Path, branch: &str) -> Result<WorkingCopy> {
        self.fs
            .remove_all(dir)
            .map_err(|e| e.for_repository(url, "remove the previous clone of"))?;
        // clone errors already carry the URL
        self.git.clone_repository(url, dir)?;
        self.git
            .checkout_new_branch(dir, branch)
            .map_err(|e| e.for_repository(url, &format!("create branch '{}' in", branch)))?;
        Ok(WorkingCopy::new(dir, Some(branch.to_string())))
    }

    fn merge_source(
        &self,
        target: &WorkingCopy,
        spec: &RepositorySpec,
        layout: &mut WorkspaceLayout,
        branch: &str,
        flags: &[MergeFlag],
        remotes: &mut HashSet<String>,
    ) -> Result<MergedSource> {
        let source_dir = layout.allocate(&spec.url);
        let source = self.fresh_clone(&spec.url, &source_dir, branch)?;

        let relocated = relocate(
            self.git.as_ref(),
            self.fs.as_ref(),
            source.directory(),
            &spec.subdirectory,
        )
        .map_err(|e| e.for_repository(&spec.url, "relocate the content of"))?;
        self.git
            .commit(source.directory(), &relocation_message(spec))
            .map_err(|e| e.for_repository(&spec.url, "commit the relocation of"))?;
        info!(
            "Moved {} entries of {} into {}",
            relocated.len(),
            spec.url,
            spec.subdirectory
        );

        // specs sharing a subdirectory share the remote name
        let remote = spec.subdirectory.as_str();
        let registered = if remotes.insert(remote.to_string()) {
            self.git
                .add_remote(target.directory(), remote, source.remote_handle())
        } else {
            self.git
                .set_remote_url(target.directory(), remote, source.remote_handle())
        };
        registered.map_err(|e| e.for_repository(&spec.url, "register a remote for"))?;

        self.git
            .pull(target.directory(), remote, branch, flags)
            .map_err(|e| e.for_repository(&spec.url, "merge"))?;
        info!("Merged {} into {}", spec.url, spec.subdirectory);

        Ok(MergedSource {
            spec: spec.clone(),
            clone: source,
            relocated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::relocate::STAGING_DIR;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Mock git operations for testing
    struct MockGitOperations {
        calls: Calls,
        version: Option<String>,
        fail_on: Option<String>,
    }

    impl MockGitOperations {
        fn new(calls: Calls) -> Self {
            Self {
                calls,
                version: Some("git version 2.40.1".to_string()),
                fail_on: None,
            }
        }

        fn record(&self, call: String) -> Result<()> {
            let fail = self
                .fail_on
                .as_ref()
                .is_some_and(|pattern| call.starts_with(pattern));
            self.calls.lock().unwrap().push(call.clone());
            if fail {
                Err(Error::GitCommand {
                    command: call,
                    url: "/work".to_string(),
                    stderr: "rejected".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl GitOperations for MockGitOperations {
        fn clone_repository(&self, url: &str, target_dir: &Path) -> Result<()> {
            self.record(format!("clone {} {}", url, target_dir.display()))
        }

        fn checkout_new_branch(&self, dir: &Path, branch: &str) -> Result<()> {
            self.record(format!("checkout -B {} {}", branch, dir.display()))
        }

        fn move_paths(&self, dir: &Path, sources: &[String], destination: &str) -> Result<()> {
            self.record(format!(
                "mv {} -> {} {}",
                sources.join(" "),
                destination,
                dir.display()
            ))
        }

        fn commit(&self, dir: &Path, message: &str) -> Result<()> {
            self.record(format!("commit '{}' {}", message, dir.display()))
        }

        fn add_remote(&self, dir: &Path, name: &str, address: &Path) -> Result<()> {
            self.record(format!(
                "remote add {} {} {}",
                name,
                address.display(),
                dir.display()
            ))
        }

        fn set_remote_url(&self, dir: &Path, name: &str, address: &Path) -> Result<()> {
            self.record(format!(
                "remote set-url {} {} {}",
                name,
                address.display(),
                dir.display()
            ))
        }

        fn pull(&self, dir: &Path, remote: &str, branch: &str, flags: &[MergeFlag]) -> Result<()> {
            let flags: Vec<_> = flags.iter().map(|f| f.as_arg()).collect();
            self.record(format!(
                "pull {} {} [{}] {}",
                remote,
                branch,
                flags.join(" "),
                dir.display()
            ))
        }

        fn apply_mailbox(&self, _: &Path, _: &Path, _: Option<&str>) -> Result<String> {
            Ok(String::new())
        }

        fn version(&self) -> Result<String> {
            self.version.clone().ok_or_else(|| Error::GitCommand {
                command: "--version".to_string(),
                url: String::new(),
                stderr: "not found".to_string(),
            })
        }
    }

    /// Every clone contains `README.md` and `src`; the staging directory is
    /// gone once moved.
    struct MockFileOperations {
        calls: Calls,
    }

    impl FileOperations for MockFileOperations {
        fn remove_all(&self, path: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("rm -rf {}", path.display()));
            Ok(())
        }

        fn create_dir_all(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            !path.to_string_lossy().contains(STAGING_DIR)
        }

        fn list_entries(&self, _dir: &Path) -> Result<Vec<String>> {
            Ok(vec![
                ".git".to_string(),
                "README.md".to_string(),
                "src".to_string(),
            ])
        }
    }

    fn settings(sources: Vec<RepositorySpec>) -> GlueSettings {
        GlueSettings {
            working_dir: PathBuf::from("/work"),
            working_branch: "git-glue".to_string(),
            target_repo: "https://github.com/someuser/target".to_string(),
            sources,
            unrelated_histories: VersionReq::parse(crate::config::DEFAULT_UNRELATED_HISTORIES_VERSIONS)
                .unwrap(),
        }
    }

    fn orchestrator(git: MockGitOperations, calls: Calls) -> MergeOrchestrator {
        MergeOrchestrator::with_operations(Box::new(git), Box::new(MockFileOperations { calls }))
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: u64,
        steps: u64,
        messages: Vec<String>,
        finished: bool,
    }

    impl ProgressReporter for RecordingProgress {
        fn start(&mut self, total: u64) {
            self.total = total;
        }
        fn message(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
        fn advance(&mut self) {
            self.steps += 1;
        }
        fn finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn test_relocation_message() {
        let spec = RepositorySpec::new("https://github.com/someuser/source1", "lib");
        assert_eq!(
            relocation_message(&spec),
            "Moved https://github.com/someuser/source1 into subdirectory lib"
        );
    }

    #[test]
    fn test_merge_call_sequence() {
        let calls: Calls = Arc::default();
        let glue = orchestrator(MockGitOperations::new(calls.clone()), calls.clone());
        let spec = RepositorySpec::new("https://github.com/someuser/source1", "lib");

        let target = glue
            .merge(&settings(vec![spec]), &mut RecordingProgress::default())
            .unwrap();

        assert_eq!(target.working_copy.directory(), Path::new("/work/target"));
        assert_eq!(target.merged.len(), 1);
        assert_eq!(target.merged[0].relocated, vec!["README.md", "src"]);

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "rm -rf /work/target",
                "clone https://github.com/someuser/target /work/target",
                "checkout -B git-glue /work/target",
                "rm -rf /work/source1",
                "clone https://github.com/someuser/source1 /work/source1",
                "checkout -B git-glue /work/source1",
                "mv README.md src -> .git-glue-staging /work/source1",
                "mv .git-glue-staging -> lib /work/source1",
                "commit 'Moved https://github.com/someuser/source1 into subdirectory lib' /work/source1",
                "remote add lib /work/source1 /work/target",
                "pull lib git-glue [--allow-unrelated-histories] /work/target",
            ]
        );
    }

    #[test]
    fn test_progress_counts_sources_plus_one() {
        let calls: Calls = Arc::default();
        let glue = orchestrator(MockGitOperations::new(calls.clone()), calls);
        let mut progress = RecordingProgress::default();
        glue.merge(
            &settings(vec![
                RepositorySpec::new("https://github.com/someuser/a", "lib/a"),
                RepositorySpec::new("https://github.com/someuser/b", "lib/b"),
            ]),
            &mut progress,
        )
        .unwrap();

        assert_eq!(progress.total, 3);
        assert_eq!(progress.steps, 3);
        assert!(progress.finished);
        assert_eq!(
            progress.messages[0],
            "Prepare target repository https://github.com/someuser/target"
        );
        assert_eq!(
            progress.messages[2],
            "Merge source repository https://github.com/someuser/b into lib/b"
        );
    }

    #[test]
    fn test_shared_subdirectory_reuses_remote() {
        let calls: Calls = Arc::default();
        let glue = orchestrator(MockGitOperations::new(calls.clone()), calls.clone());
        glue.merge(
            &settings(vec![
                RepositorySpec::new("https://github.com/someuser/source2", "src/subdir"),
                RepositorySpec::new("https://github.com/someuser/source3", "src/subdir"),
            ]),
            &mut RecordingProgress::default(),
        )
        .unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"remote add src/subdir /work/source2 /work/target".to_string()));
        assert!(calls.contains(&"remote set-url src/subdir /work/source3 /work/target".to_string()));
    }

    #[test]
    fn test_source_named_like_target_gets_own_directory() {
        let calls: Calls = Arc::default();
        let glue = orchestrator(MockGitOperations::new(calls.clone()), calls.clone());
        glue.merge(
            &settings(vec![RepositorySpec::new(
                "https://github.com/otheruser/target",
                "vendor/target",
            )]),
            &mut RecordingProgress::default(),
        )
        .unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"rm -rf /work/target-2".to_string()));
        assert_eq!(
            calls.iter().filter(|c| *c == "rm -rf /work/target").count(),
            1
        );
    }

    #[test]
    fn test_old_git_gets_no_flags() {
        let calls: Calls = Arc::default();
        let mut git = MockGitOperations::new(calls.clone());
        git.version = Some("git version 2.8.0".to_string());
        let glue = orchestrator(git, calls.clone());
        glue.merge(
            &settings(vec![RepositorySpec::new("https://h/o/lib", "lib")]),
            &mut RecordingProgress::default(),
        )
        .unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"pull lib git-glue [] /work/target".to_string()));
    }

    #[test]
    fn test_undetectable_version_gets_no_flags() {
        let calls: Calls = Arc::default();
        let mut git = MockGitOperations::new(calls.clone());
        git.version = None;
        let glue = orchestrator(git, calls);
        let req = VersionReq::parse(">=2.9.0, <3.0.0").unwrap();
        assert!(glue.merge_flags(&req).is_empty());
    }

    #[test]
    fn test_failure_names_repository_and_stops() {
        let calls: Calls = Arc::default();
        let mut git = MockGitOperations::new(calls.clone());
        git.fail_on = Some("pull lib/b".to_string());
        let glue = orchestrator(git, calls.clone());

        let err = glue
            .merge(
                &settings(vec![
                    RepositorySpec::new("https://github.com/someuser/a", "lib/a"),
                    RepositorySpec::new("https://github.com/someuser/b", "lib/b"),
                    RepositorySpec::new("https://github.com/someuser/c", "lib/c"),
                ]),
                &mut RecordingProgress::default(),
            )
            .unwrap_err();

        match &err {
            Error::Repository { url, operation, .. } => {
                assert_eq!(url, "https://github.com/someuser/b");
                assert_eq!(operation, "merge");
            }
            other => panic!("unexpected error: {other}"),
        }
        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("someuser/c")));
    }

    #[test]
    fn test_clone_failure_of_target_aborts() {
        let calls: Calls = Arc::default();
        let mut git = MockGitOperations::new(calls.clone());
        git.fail_on = Some("checkout -B git-glue /work/target".to_string());
        let glue = orchestrator(git, calls);

        let err = glue
            .merge(
                &settings(vec![RepositorySpec::new("https://h/o/lib", "lib")]),
                &mut RecordingProgress::default(),
            )
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to create branch 'git-glue' in https://github.com/someuser/target"));
    }
}
