//! Integration tests for the push workflow.
//!
//! These tests drive real git against a working tree and a bare "remote"
//! created via tempfile, and check what ends up in both.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use designsync::auth::CredentialResolver;
use designsync::core::changelog::read_entries;
use designsync::core::config::RepositoryConfig;
use designsync::core::ops::RunLock;
use designsync::core::paths::RepoPaths;
use designsync::engine::{
    ErrorKind, FixedClock, PushOutcome, PushRequest, Status, WorkflowContext, WorkflowEngine,
    WorkflowResult,
};
use designsync::secrets::MemorySecretStore;

const BRANCH: &str = "export/Bracket-20240309-140500";

fn at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 0)
        .unwrap()
}

/// Test fixture: a working tree on `main` with one pushed commit, a bare
/// remote, and a directory of exported files outside the working tree.
struct TestRepo {
    dir: TempDir,
    work: PathBuf,
    remote: PathBuf,
    exports: PathBuf,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let work = dir.path().join("work");
        let remote = dir.path().join("remote.git");
        let exports = dir.path().join("exports");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::create_dir_all(&exports).unwrap();

        run_git(dir.path(), &["init", "--bare", "remote.git"]);
        run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&work, &["init"]);
        run_git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&work, &["config", "user.email", "test@example.com"]);
        run_git(&work, &["config", "user.name", "Test User"]);
        run_git(&work, &["config", "commit.gpgsign", "false"]);

        std::fs::write(work.join("README.md"), "# Designs\n").unwrap();
        run_git(&work, &["add", "README.md"]);
        run_git(&work, &["commit", "-m", "Initial commit"]);
        run_git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
        run_git(&work, &["push", "-u", "origin", "main"]);

        Self {
            dir,
            work,
            remote,
            exports,
        }
    }

    /// Write an exported file and return its path.
    fn export(&self, name: &str, content: &str) -> PathBuf {
        let path = self.exports.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> RepositoryConfig {
        RepositoryConfig::new("fixture", self.remote.to_str().unwrap(), self.work.clone())
    }

    fn request(&self, files: Vec<PathBuf>) -> PushRequest {
        PushRequest::new(self.config(), "Bracket").with_files(files)
    }

    fn git(&self, args: &[&str]) -> String {
        git_stdout(&self.work, args)
    }

    fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn stash_count(&self) -> usize {
        self.git(&["stash", "list"]).lines().count()
    }

    fn local_branch_exists(&self, name: &str) -> bool {
        git_ok(&self.work, &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
    }

    fn remote_branch(&self, name: &str) -> Option<String> {
        let output = Command::new("git")
            .arg("--git-dir")
            .arg(&self.remote)
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .output()
            .expect("git rev-parse failed");
        output
            .status
            .success()
            .then(|| String::from_utf8(output.stdout).unwrap().trim().to_string())
    }
}

fn engine() -> WorkflowEngine {
    engine_at(at())
}

fn engine_at(now: NaiveDateTime) -> WorkflowEngine {
    let ctx = WorkflowContext::from_env().with_clock(Arc::new(FixedClock(now)));
    WorkflowEngine::new(ctx, CredentialResolver::new(Arc::new(MemorySecretStore::new())))
}

fn run(request: &PushRequest) -> WorkflowResult {
    engine().run(request)
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn git_ok(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed")
        .status
        .success()
}

fn primary_kind(result: &WorkflowResult) -> ErrorKind {
    result.primary_error().expect("expected an error").kind
}

// =============================================================================
// Success paths
// =============================================================================

#[test]
fn clean_tree_publishes_branch() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "solid bracket\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Success, "{:?}", result.errors);
    assert_eq!(result.branch.as_ref().unwrap().as_str(), BRANCH);
    assert!(matches!(result.push, PushOutcome::Pushed { .. }));
    assert_eq!(result.files, ["Bracket.step", "CHANGELOG.md"]);

    let commit = result.commit.as_ref().unwrap().as_str().to_string();
    assert_eq!(repo.remote_branch(BRANCH).as_deref(), Some(commit.as_str()));
    assert_eq!(repo.current_branch(), BRANCH);
    assert_eq!(repo.git(&["log", "-1", "--format=%s"]), "Design update: Bracket");
    assert_eq!(
        std::fs::read_to_string(repo.work.join("Bracket.step")).unwrap(),
        "solid bracket\n"
    );
    assert_eq!(repo.stash_count(), 0);
}

#[test]
fn changelog_records_the_push() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "v1\n");

    let result = run(&repo.request(vec![file]).with_message("First cut of {filename}"));
    assert!(result.is_success(), "{:?}", result.errors);

    let entries = read_entries(&repo.work.join("CHANGELOG.md")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].branch.as_str(), BRANCH);
    assert_eq!(entries[0].message, "First cut of Bracket");
    assert_eq!(entries[0].files, ["Bracket.step"]);
    assert_eq!(entries[0].timestamp, at());

    let tracked = repo.git(&["ls-tree", "-r", "--name-only", "HEAD"]);
    assert!(tracked.lines().any(|l| l == "CHANGELOG.md"));
}

#[test]
fn dirty_tree_is_restored_and_not_committed() {
    let repo = TestRepo::new();
    std::fs::write(repo.work.join("README.md"), "# Designs\n\nwork in progress\n").unwrap();
    std::fs::write(repo.work.join("notes.txt"), "scratch\n").unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Success, "{:?}", result.errors);
    assert_eq!(
        std::fs::read_to_string(repo.work.join("README.md")).unwrap(),
        "# Designs\n\nwork in progress\n"
    );
    assert_eq!(
        std::fs::read_to_string(repo.work.join("notes.txt")).unwrap(),
        "scratch\n"
    );
    assert_eq!(repo.stash_count(), 0);

    let tracked = repo.git(&["ls-tree", "-r", "--name-only", "HEAD"]);
    assert!(!tracked.lines().any(|l| l == "notes.txt"));
    assert_eq!(repo.git(&["show", "HEAD:README.md"]), "# Designs");
}

#[test]
fn export_subfolder_is_rendered() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.stl", "mesh\n");
    let mut config = repo.config();
    config.export_subfolder = "exports/{filename}".to_string();
    config.changelog = false;

    let result = run(&PushRequest::new(config, "Bracket").with_files(vec![file]));

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.files, ["exports/Bracket/Bracket.stl"]);
    assert!(repo.work.join("exports/Bracket/Bracket.stl").is_file());
    assert!(!repo.work.join("CHANGELOG.md").exists());
}

#[test]
fn return_to_original_branch() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "solid\n");
    let mut request = repo.request(vec![file]);
    request.return_to_original_branch = true;

    let result = run(&request);

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(repo.current_branch(), "main");
    assert!(repo.local_branch_exists(BRANCH));
}

#[test]
fn branch_override_is_sanitized() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]).with_branch_override("review/My Bracket (v2)"));

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.branch.unwrap().as_str(), "review/My-Bracket-v2");
    assert!(repo.remote_branch("review/My-Bracket-v2").is_some());
}

#[test]
fn unchanged_export_is_nothing_to_commit() {
    let repo = TestRepo::new();
    std::fs::write(repo.work.join("Bracket.step"), "same\n").unwrap();
    run_git(&repo.work, &["add", "Bracket.step"]);
    run_git(&repo.work, &["commit", "-m", "Add bracket"]);
    let file = repo.export("Bracket.step", "same\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.push, PushOutcome::NothingToPush);
    assert!(result.commit.is_none());
    assert!(result.warnings.iter().any(|w| w.contains("nothing to commit")));
    assert!(repo.remote_branch(BRANCH).is_none());
    assert!(!repo.work.join("CHANGELOG.md").exists());
    assert!(repo.local_branch_exists(BRANCH));
    assert_eq!(repo.current_branch(), BRANCH);
}

#[test]
fn identical_exports_a_second_apart_get_their_own_branches() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "solid\n");
    let request = repo.request(vec![file]);

    let first = engine_at(at()).run(&request);
    assert!(first.is_success(), "{:?}", first.errors);

    run_git(&repo.work, &["checkout", "main"]);
    let later = at() + chrono::Duration::seconds(1);
    let second = engine_at(later).run(&request);
    assert!(second.is_success(), "{:?}", second.errors);

    let first_branch = first.branch.unwrap();
    let second_branch = second.branch.unwrap();
    assert_eq!(first_branch.as_str(), BRANCH);
    assert_eq!(second_branch.as_str(), "export/Bracket-20240309-140501");
    assert!(repo.remote_branch(first_branch.as_str()).is_some());
    assert!(repo.remote_branch(second_branch.as_str()).is_some());
}

#[test]
fn skip_pull_still_publishes() {
    let repo = TestRepo::new();
    let file = repo.export("Bracket.step", "solid\n");
    let mut request = repo.request(vec![file]);
    request.skip_pull = true;

    let result = run(&request);
    assert!(result.is_success(), "{:?}", result.errors);
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn pull_conflict_restores_local_work() {
    let repo = TestRepo::new();

    // Someone else changes README on the remote.
    let other = repo.dir.path().join("other");
    run_git(
        repo.dir.path(),
        &["clone", "-b", "main", repo.remote.to_str().unwrap(), "other"],
    );
    run_git(&other, &["config", "user.email", "other@example.com"]);
    run_git(&other, &["config", "user.name", "Other"]);
    run_git(&other, &["config", "commit.gpgsign", "false"]);
    std::fs::write(other.join("README.md"), "# Theirs\n").unwrap();
    run_git(&other, &["commit", "-am", "Their change"]);
    run_git(&other, &["push", "origin", "main"]);

    // A conflicting local commit plus uncommitted work.
    std::fs::write(repo.work.join("README.md"), "# Ours\n").unwrap();
    run_git(&repo.work, &["commit", "-am", "Our change"]);
    let head_before = repo.git(&["rev-parse", "HEAD"]);
    std::fs::write(repo.work.join("notes.txt"), "scratch\n").unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::ConflictError);
    assert_eq!(result.push, PushOutcome::NotAttempted);
    assert!(result.branch.is_none());
    assert_eq!(repo.current_branch(), "main");
    assert_eq!(repo.git(&["rev-parse", "HEAD"]), head_before);
    assert!(!repo.work.join(".git/rebase-merge").exists());
    assert!(!repo.work.join(".git/rebase-apply").exists());
    assert_eq!(
        std::fs::read_to_string(repo.work.join("notes.txt")).unwrap(),
        "scratch\n"
    );
    assert_eq!(repo.stash_count(), 0);
}

#[test]
fn stash_that_cannot_be_reapplied_is_kept() {
    let repo = TestRepo::new();
    // An untracked draft with the same name as the export: once the export
    // is committed, popping the stash would overwrite it.
    std::fs::write(repo.work.join("Bracket.step"), "local draft\n").unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::PartialRecoveryNeeded, "{:?}", result.errors);
    assert_eq!(primary_kind(&result), ErrorKind::RecoveryError);
    assert!(matches!(result.push, PushOutcome::Pushed { .. }));
    assert!(repo.remote_branch(BRANCH).is_some());

    let stash = result.preserved_stash.expect("stash should be reported");
    assert_eq!(stash.selector.as_deref(), Some("stash@{0}"));
    assert_eq!(repo.stash_count(), 1);
    assert_eq!(repo.git(&["rev-parse", "stash@{0}"]), stash.oid.as_str());
}

#[test]
fn missing_artifact_undoes_branch() {
    let repo = TestRepo::new();
    std::fs::write(repo.work.join("notes.txt"), "scratch\n").unwrap();
    let present = repo.export("Bracket.step", "solid\n");
    let missing = repo.exports.join("Bracket.stl");

    let result = run(&repo.request(vec![present, missing]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::OperationError);
    assert_eq!(repo.current_branch(), "main");
    assert!(!repo.local_branch_exists(BRANCH));
    assert!(!repo.work.join("Bracket.step").exists());
    assert!(repo.work.join("notes.txt").exists());
    assert_eq!(repo.stash_count(), 0);
}

#[test]
fn missing_local_path_is_configuration_error() {
    let repo = TestRepo::new();
    let mut config = repo.config();
    config.local_path = repo.dir.path().join("does-not-exist");
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&PushRequest::new(config, "Bracket").with_files(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::ConfigurationError);
    assert_eq!(result.push, PushOutcome::NotAttempted);
}

#[test]
fn missing_remote_is_configuration_error() {
    let repo = TestRepo::new();
    let mut config = repo.config();
    config.remote = "upstream".to_string();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&PushRequest::new(config, "Bracket").with_files(vec![file]));

    assert_eq!(primary_kind(&result), ErrorKind::ConfigurationError);
    assert!(!repo.local_branch_exists(BRANCH));
}

#[test]
fn detached_head_is_refused() {
    let repo = TestRepo::new();
    run_git(&repo.work, &["checkout", "--detach"]);
    std::fs::write(repo.work.join("notes.txt"), "scratch\n").unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::RepositoryStateError);
    assert_eq!(repo.stash_count(), 0);
    assert!(repo.work.join("notes.txt").exists());
}

#[test]
fn rebase_in_progress_is_refused() {
    let repo = TestRepo::new();
    std::fs::create_dir(repo.work.join(".git/rebase-merge")).unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::RepositoryStateError);
    assert!(!repo.local_branch_exists(BRANCH));
}

#[test]
fn concurrent_run_is_refused() {
    let repo = TestRepo::new();
    let paths = RepoPaths::discover(&repo.work).unwrap();
    let _held = RunLock::acquire(&paths).unwrap();
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(primary_kind(&result), ErrorKind::RepositoryStateError);
    assert!(result.errors[0].message.contains("in progress"));
    assert!(!repo.local_branch_exists(BRANCH));
}

#[test]
fn existing_branch_name_fails_without_touching_it() {
    let repo = TestRepo::new();
    run_git(&repo.work, &["branch", BRANCH]);
    let file = repo.export("Bracket.step", "solid\n");

    let result = run(&repo.request(vec![file]));

    assert_eq!(result.status, Status::Failed);
    assert_eq!(repo.current_branch(), "main");
    assert!(repo.local_branch_exists(BRANCH));
    assert!(!repo.work.join("Bracket.step").exists());
}
