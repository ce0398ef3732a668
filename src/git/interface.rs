//! git::interface
//!
//! Typed git operations over the git command line.
//!
//! This module is the **single doorway** to git. Every command the
//! workflow runs goes through [`GitClient`], which builds the argument
//! list, applies the timeout, logs the call, and classifies the result.
//!
//! # Error Handling
//!
//! Expected git failures (dirty tree, conflict, rejected push, bad
//! credentials) are values: every operation returns a [`GitOutput`] whose
//! `kind` says what went wrong. `Err(GitError)` is reserved for problems
//! the caller should have prevented or cannot recover from inside a
//! workflow: a missing repository root, or a git executable that cannot
//! be started.
//!
//! # Credentials
//!
//! The client accepts credentials only as environment overrides (see
//! [`GitClient::with_env`]). They are never placed in argv, and only the
//! variable *names* reach the log.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::classify::{classify, GitErrorKind};
use super::runner::{CommandSpec, ProcessError, ProcessRunner};
use crate::core::paths::RepoPaths;
use crate::core::types::{BranchName, Oid};

/// Per-command timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Commands that only touch the local repository.
    pub local: Duration,
    /// Commands that talk to a remote (pull, push, clone).
    pub network: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            local: Duration::from_secs(120),
            network: Duration::from_secs(300),
        }
    }
}

/// Programmer-level errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The working tree root does not exist.
    #[error("repository root does not exist: {path}")]
    MissingRoot { path: PathBuf },

    /// The git executable could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Result of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Classification when `ok` is false.
    pub kind: Option<GitErrorKind>,
    pub timed_out: bool,
}

impl GitOutput {
    /// The most useful single line for humans: the last `fatal:`/`error:`
    /// line of stderr, else the last non-empty line of either stream.
    pub fn message(&self) -> String {
        let lines = || {
            self.stderr
                .lines()
                .chain(self.stdout.lines())
                .map(str::trim)
                .filter(|l| !l.is_empty())
        };
        lines()
            .filter(|l| l.starts_with("fatal:") || l.starts_with("error:"))
            .last()
            .or_else(|| lines().last())
            .unwrap_or("git produced no output")
            .to_string()
    }

    /// Stdout without surrounding whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// The failure kind, `Unknown` if none was recorded.
    pub fn kind_or_unknown(&self) -> GitErrorKind {
        self.kind.unwrap_or(GitErrorKind::Unknown)
    }
}

/// In-progress multi-step operation, read from the git directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Rebase,
    Merge,
    CherryPick,
    Revert,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use designsync::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// The failure kind this state blocks with.
    pub fn blocking_kind(&self) -> Option<GitErrorKind> {
        match self {
            GitState::Clean => None,
            GitState::Rebase => Some(GitErrorKind::RebaseInProgress),
            GitState::Merge | GitState::CherryPick | GitState::Revert => {
                Some(GitErrorKind::MergeConflict)
            }
        }
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
        }
    }
}

impl fmt::Display for GitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Summary of `git status --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Parse `git status --porcelain=v1` output.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut status = Self::default();
        for line in output.lines() {
            let mut codes = line.chars();
            let (Some(x), Some(y)) = (codes.next(), codes.next()) else {
                continue;
            };
            if x == '?' && y == '?' {
                status.untracked += 1;
                continue;
            }
            if x == '!' {
                continue;
            }
            if x == 'U' || y == 'U' || (x == 'A' && y == 'A') || (x == 'D' && y == 'D') {
                status.has_conflicts = true;
            }
            if x != ' ' {
                status.staged += 1;
            }
            if y != ' ' {
                status.unstaged += 1;
            }
        }
        status
    }

    /// Check if the worktree has no changes at all, untracked included.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0 && !self.has_conflicts
    }
}

/// One `git stash list` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashEntry {
    pub oid: Oid,
    /// Reflog selector, e.g. `stash@{0}`.
    pub selector: String,
    pub subject: String,
}

/// How to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    Plain,
    SetUpstream,
    ForceWithLease,
}

/// Outcome of `git diff --cached --quiet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedDiff {
    /// Index matches HEAD for the given paths.
    Unchanged,
    /// Something is staged.
    Changed,
    /// The diff itself failed.
    Failed(GitOutput),
}

/// The git interface for one working tree.
#[derive(Clone)]
pub struct GitClient {
    runner: Arc<dyn ProcessRunner>,
    program: PathBuf,
    paths: RepoPaths,
    timeouts: Timeouts,
    env: Vec<(String, String)>,
}

impl fmt::Debug for GitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitClient")
            .field("program", &self.program)
            .field("paths", &self.paths)
            .field("timeouts", &self.timeouts)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl GitClient {
    /// Create a client for the working tree described by `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::MissingRoot`] if the working tree is missing.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        program: PathBuf,
        paths: RepoPaths,
        timeouts: Timeouts,
    ) -> Result<Self, GitError> {
        if !paths.work_dir.is_dir() {
            return Err(GitError::MissingRoot {
                path: paths.work_dir.clone(),
            });
        }
        Ok(Self {
            runner,
            program,
            paths,
            timeouts,
            env: Vec::new(),
        })
    }

    /// A copy of this client whose commands also receive `env`.
    pub fn with_env(&self, env: Vec<(String, String)>) -> Self {
        let mut client = self.clone();
        client.env.extend(env);
        client
    }

    /// Paths of the working tree.
    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    /// Working tree root.
    pub fn work_dir(&self) -> &Path {
        &self.paths.work_dir
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// In-progress operation, read from git directory markers.
    pub fn state(&self) -> GitState {
        let paths = &self.paths;
        if paths.git_dir_has("rebase-merge") || paths.git_dir_has("rebase-apply") {
            GitState::Rebase
        } else if paths.git_dir_has("MERGE_HEAD") {
            GitState::Merge
        } else if paths.git_dir_has("CHERRY_PICK_HEAD") {
            GitState::CherryPick
        } else if paths.git_dir_has("REVERT_HEAD") {
            GitState::Revert
        } else {
            GitState::Clean
        }
    }

    /// `git status --porcelain`, untracked files included.
    pub fn status(&self) -> Result<GitOutput, GitError> {
        self.local(&["status", "--porcelain=v1", "--untracked-files=all"])
    }

    /// Short name of the checked-out branch. Fails when HEAD is detached.
    pub fn current_branch(&self) -> Result<GitOutput, GitError> {
        self.local(&["symbolic-ref", "--quiet", "--short", "HEAD"])
    }

    /// Commit id of HEAD. Fails in a repository without commits.
    pub fn head_oid(&self) -> Result<GitOutput, GitError> {
        self.rev_parse("HEAD")
    }

    /// Resolve a revision to a commit id.
    pub fn rev_parse(&self, rev: &str) -> Result<GitOutput, GitError> {
        self.local(&["rev-parse", "--verify", "--quiet", rev])
    }

    /// Names of configured remotes, one per line.
    pub fn remotes(&self) -> Result<GitOutput, GitError> {
        self.local(&["remote"])
    }

    /// URL of a remote.
    pub fn remote_url(&self, remote: &str) -> Result<GitOutput, GitError> {
        self.local(&["remote", "get-url", remote])
    }

    /// Whether the index differs from HEAD for `paths`.
    pub fn staged_diff(&self, paths: &[String]) -> Result<StagedDiff, GitError> {
        let mut args = vec!["diff", "--cached", "--quiet", "--"];
        args.extend(paths.iter().map(String::as_str));
        let out = self.local(&args)?;
        Ok(match out.exit_code {
            Some(0) if !out.timed_out => StagedDiff::Unchanged,
            Some(1) if out.stderr.trim().is_empty() => StagedDiff::Changed,
            _ => StagedDiff::Failed(out),
        })
    }

    // =========================================================================
    // Stash
    // =========================================================================

    /// Commit id of `refs/stash`, if any.
    pub fn stash_oid(&self) -> Result<Option<Oid>, GitError> {
        let out = self.rev_parse("refs/stash")?;
        Ok(out
            .ok
            .then(|| Oid::new(out.stdout_trimmed()).ok())
            .flatten())
    }

    /// Stash everything, untracked files included.
    pub fn stash_push(&self, label: &str) -> Result<GitOutput, GitError> {
        self.local(&["stash", "push", "--include-untracked", "--message", label])
    }

    /// List stash entries, newest first.
    pub fn stash_list(&self) -> Result<(GitOutput, Vec<StashEntry>), GitError> {
        let out = self.local(&["stash", "list", "--format=%H %gd %gs"])?;
        let entries = if out.ok {
            out.stdout
                .lines()
                .filter_map(|line| {
                    let mut parts = line.splitn(3, ' ');
                    let oid = Oid::new(parts.next()?).ok()?;
                    let selector = parts.next()?.to_string();
                    let subject = parts.next().unwrap_or_default().to_string();
                    Some(StashEntry {
                        oid,
                        selector,
                        subject,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok((out, entries))
    }

    /// Pop a stash entry, optionally reinstating its index.
    pub fn stash_pop(&self, selector: &str, restore_index: bool) -> Result<GitOutput, GitError> {
        if restore_index {
            self.local(&["stash", "pop", "--index", selector])
        } else {
            self.local(&["stash", "pop", selector])
        }
    }

    // =========================================================================
    // History and branches
    // =========================================================================

    /// `git pull --rebase <remote> <branch>`.
    pub fn pull_rebase(&self, remote: &str, branch: &BranchName) -> Result<GitOutput, GitError> {
        self.network(&["pull", "--rebase", "--no-autostash", remote, branch.as_str()])
    }

    /// Abort an in-progress rebase.
    pub fn rebase_abort(&self) -> Result<GitOutput, GitError> {
        self.local(&["rebase", "--abort"])
    }

    /// Create `branch` at HEAD and check it out.
    pub fn create_branch(&self, branch: &BranchName) -> Result<GitOutput, GitError> {
        self.local(&["checkout", "-b", branch.as_str()])
    }

    /// Check out an existing branch.
    pub fn checkout(&self, branch: &BranchName) -> Result<GitOutput, GitError> {
        self.local(&["checkout", branch.as_str(), "--"])
    }

    /// Force-delete a local branch.
    pub fn delete_branch(&self, branch: &BranchName) -> Result<GitOutput, GitError> {
        self.local(&["branch", "-D", branch.as_str()])
    }

    /// Stage `paths`.
    pub fn add(&self, paths: &[String]) -> Result<GitOutput, GitError> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.local(&args)
    }

    /// Commit the index.
    pub fn commit(&self, message: &str) -> Result<GitOutput, GitError> {
        self.local(&["commit", "--message", message])
    }

    /// Push `branch` to `remote`.
    pub fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        mode: PushMode,
    ) -> Result<GitOutput, GitError> {
        let mut args = vec!["push"];
        match mode {
            PushMode::Plain => {}
            PushMode::SetUpstream => args.push("--set-upstream"),
            PushMode::ForceWithLease => args.push("--force-with-lease"),
        }
        args.extend([remote, branch.as_str()]);
        self.network(&args)
    }

    /// Discard tracked changes in the index and working tree.
    pub fn reset_hard(&self) -> Result<GitOutput, GitError> {
        self.local(&["reset", "--hard", "--quiet"])
    }

    /// Remove untracked files among `paths`.
    pub fn clean_paths(&self, paths: &[String]) -> Result<GitOutput, GitError> {
        let mut args = vec!["clean", "-f", "--quiet", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.local(&args)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn local(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.run(args, self.timeouts.local)
    }

    fn network(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.run(args, self.timeouts.network)
    }

    fn run(&self, args: &[&str], timeout: Duration) -> Result<GitOutput, GitError> {
        run_git(
            self.runner.as_ref(),
            &self.program,
            &self.paths.work_dir,
            args,
            &self.env,
            timeout,
        )
    }
}

/// Clone `url` into `dest`, which must not exist yet.
///
/// # Errors
///
/// Returns [`GitError`] if git cannot be started or the parent of `dest`
/// is missing.
pub fn clone_repository(
    runner: &dyn ProcessRunner,
    program: &Path,
    url: &str,
    dest: &Path,
    env: &[(String, String)],
    timeout: Duration,
) -> Result<GitOutput, GitError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(GitError::MissingRoot { path: parent });
    }
    let dest = dest.display().to_string();
    run_git(runner, program, &parent, &["clone", "--", url, &dest], env, timeout)
}

fn run_git(
    runner: &dyn ProcessRunner,
    program: &Path,
    cwd: &Path,
    args: &[&str],
    extra_env: &[(String, String)],
    timeout: Duration,
) -> Result<GitOutput, GitError> {
    let mut env = vec![
        ("LC_ALL".to_string(), "C".to_string()),
        ("LANG".to_string(), "C".to_string()),
        ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
    ];
    env.extend(extra_env.iter().cloned());

    let mut full_args = vec!["-c".to_string(), "core.quotepath=off".to_string()];
    full_args.extend(args.iter().map(|a| a.to_string()));

    let spec = CommandSpec {
        program: program.to_path_buf(),
        args: full_args,
        cwd: cwd.to_path_buf(),
        env,
        timeout: Some(timeout),
    };

    tracing::debug!(
        program = %spec.program.display(),
        args = ?args,
        cwd = %spec.cwd.display(),
        env = ?spec.env_names(),
        "running git"
    );

    let out = runner.run(&spec)?;
    let kind = classify(out.exit_code, &out.stderr, &out.stdout, out.timed_out);

    if let Some(kind) = kind {
        tracing::debug!(
            exit_code = ?out.exit_code,
            %kind,
            stderr = %out.stderr.trim(),
            "git {} failed",
            args.first().copied().unwrap_or_default()
        );
    }

    Ok(GitOutput {
        ok: kind.is_none(),
        stdout: out.stdout,
        stderr: out.stderr,
        exit_code: out.exit_code,
        kind,
        timed_out: out.timed_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::git::runner::ProcessOutput;
    use tempfile::TempDir;

    /// Records specs and answers with a fixed output.
    struct Recording {
        seen: Mutex<Vec<CommandSpec>>,
        reply: ProcessOutput,
    }

    impl ProcessRunner for Recording {
        fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
            self.seen.lock().unwrap().push(spec.clone());
            Ok(self.reply.clone())
        }
    }

    fn client(reply: ProcessOutput) -> (TempDir, Arc<Recording>, GitClient) {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply,
        });
        let paths = RepoPaths::new(temp.path().to_path_buf(), temp.path().join(".git"));
        let client = GitClient::new(
            runner.clone(),
            PathBuf::from("git"),
            paths,
            Timeouts::default(),
        )
        .unwrap();
        (temp, runner, client)
    }

    fn ok(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_root_is_error() {
        let paths = RepoPaths::new(PathBuf::from("/nonexistent/designsync"), PathBuf::new());
        let result = GitClient::new(
            Arc::new(crate::git::SystemProcessRunner),
            PathBuf::from("git"),
            paths,
            Timeouts::default(),
        );
        assert!(matches!(result, Err(GitError::MissingRoot { .. })));
    }

    #[test]
    fn push_uses_network_timeout_and_env() {
        let (_temp, runner, client) = client(ok(""));
        let branch = BranchName::new("export/a").unwrap();
        client
            .with_env(vec![("GIT_ASKPASS".into(), "/tmp/askpass".into())])
            .push("origin", &branch, PushMode::SetUpstream)
            .unwrap();

        let seen = runner.seen.lock().unwrap();
        let spec = &seen[0];
        assert_eq!(spec.timeout, Some(Timeouts::default().network));
        assert_eq!(
            &spec.args[2..],
            ["push", "--set-upstream", "origin", "export/a"]
        );
        assert!(spec.env_names().contains(&"GIT_ASKPASS"));
        assert!(spec.env_names().contains(&"GIT_TERMINAL_PROMPT"));
    }

    #[test]
    fn failure_is_classified_value() {
        let (_temp, _runner, client) = client(ProcessOutput {
            exit_code: Some(128),
            stderr: "fatal: Authentication failed for 'https://h/o/r.git/'\n".into(),
            ..Default::default()
        });
        let out = client.head_oid().unwrap();
        assert!(!out.ok);
        assert_eq!(out.kind, Some(GitErrorKind::AuthenticationFailed));
        assert_eq!(
            out.message(),
            "fatal: Authentication failed for 'https://h/o/r.git/'"
        );
    }

    #[test]
    fn staged_diff_exit_codes() {
        let (_temp, _runner, git) = client(ok(""));
        assert_eq!(git.staged_diff(&[]).unwrap(), StagedDiff::Unchanged);

        let (_temp, _runner, git) = client(ProcessOutput {
            exit_code: Some(1),
            ..Default::default()
        });
        assert_eq!(git.staged_diff(&[]).unwrap(), StagedDiff::Changed);

        let (_temp, _runner, git) = client(ProcessOutput {
            exit_code: Some(128),
            stderr: "fatal: bad".into(),
            ..Default::default()
        });
        assert!(matches!(
            git.staged_diff(&[]).unwrap(),
            StagedDiff::Failed(_)
        ));
    }

    #[test]
    fn stash_list_parses_entries() {
        let (_temp, _runner, client) = client(ok(
            "abc123def4567890abc123def4567890abc12345 stash@{0} On main: designsync-autostash 20240309-140500\n\
             0000000000000000000000000000000000000001 stash@{1} WIP on main: 1234567 msg\n",
        ));
        let (_, entries) = client.stash_list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].selector, "stash@{0}");
        assert!(entries[0].subject.contains("designsync-autostash"));
        assert_eq!(entries[1].oid.short(4), "0000");
    }

    #[test]
    fn state_reads_markers() {
        let (temp, _runner, client) = client(ok(""));
        assert_eq!(client.state(), GitState::Clean);
        std::fs::create_dir_all(temp.path().join(".git/rebase-apply")).unwrap();
        assert_eq!(client.state(), GitState::Rebase);
        assert_eq!(
            client.state().blocking_kind(),
            Some(GitErrorKind::RebaseInProgress)
        );
    }

    #[test]
    fn porcelain_parsing() {
        let status = WorktreeStatus::parse_porcelain(" M a\nM  b\n?? c\nUU d\n");
        assert_eq!(status.untracked, 1);
        assert_eq!(status.staged, 2);
        assert_eq!(status.unstaged, 2);
        assert!(status.has_conflicts);
        assert!(!status.is_clean());
        assert!(WorktreeStatus::parse_porcelain("").is_clean());
    }

    #[test]
    fn message_prefers_fatal_line() {
        let out = GitOutput {
            ok: false,
            stdout: String::new(),
            stderr: "hint: try again\nfatal: the real problem\nhint: more\n".into(),
            exit_code: Some(1),
            kind: Some(GitErrorKind::Unknown),
            timed_out: false,
        };
        assert_eq!(out.message(), "fatal: the real problem");
    }
}
