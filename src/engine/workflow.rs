//! engine::workflow
//!
//! The workflow state machine.
//!
//! # Phases
//!
//! 1. **Validate** - working tree, lock, HEAD attached, nothing in progress,
//!    remote configured
//! 2. **Autostash** - stash a dirty tree, untracked files included
//! 3. **Pull** - `pull --rebase <remote> <branch>` unless skipped
//! 4. **Branch** - resolve the branch name and `checkout -b`
//! 5. **Export-consume** - copy artifacts into the working tree
//! 6. **Changelog** - stage artifacts; if they changed, prepend an entry
//! 7. **Stage & Commit** - commit, or stop here with "nothing to commit"
//! 8. **Push** - with credentials, one `--set-upstream` retry and one
//!    `--force-with-lease` retry when forcing
//! 9. **Restore** - pop the autostash
//!
//! Any phase may fail. The failure handler unwinds according to how far
//! the run got (see [`rollback`](super::rollback)) and always finishes
//! with the autostash restored or preserved.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::request::PushRequest;
use super::result::{
    ErrorKind, PreservedStash, PushOutcome, Status, WorkflowError, WorkflowResult,
};
use super::rollback::{abort_rebase, restore_autostash, undo_branch, RestoreOutcome};
use super::state::{Phase, WorkflowState};
use super::WorkflowContext;
use crate::auth::{AskpassEnv, CredentialResolver, RepoIdentity};
use crate::core::changelog::{self, ChangelogEntry};
use crate::core::config::normalize_export_subfolder;
use crate::core::naming::{
    render, resolve_branch_name, TemplateContext, DEFAULT_COMMIT_TEMPLATE,
};
use crate::core::ops::{LockError, RunLock};
use crate::core::paths::RepoPaths;
use crate::core::types::{BranchName, Oid};
use crate::git::{
    is_missing_remote_ref, is_missing_upstream, is_nothing_to_stash, GitClient, GitError,
    GitErrorKind, GitOutput, PushMode, StagedDiff, WorktreeStatus,
};

/// Label prefix of stashes created by a run.
pub const AUTOSTASH_LABEL: &str = "designsync-autostash";

/// Runs the publishing workflow.
#[derive(Debug)]
pub struct WorkflowEngine {
    ctx: WorkflowContext,
    credentials: CredentialResolver,
}

impl WorkflowEngine {
    pub fn new(ctx: WorkflowContext, credentials: CredentialResolver) -> Self {
        Self { ctx, credentials }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    /// Run the workflow for `request`.
    ///
    /// Never fails and never panics on git errors: every outcome, including
    /// a preserved autostash, is reported in the returned result.
    pub fn run(&self, request: &PushRequest) -> WorkflowResult {
        let started = Instant::now();
        let mut state = WorkflowState::new();
        for warning in &request.upstream_warnings {
            state.warn(warning.clone());
        }

        tracing::info!(
            repo = %request.repository.name,
            path = %request.repository.local_path.display(),
            files = request.files.len(),
            "starting push workflow"
        );

        let (git, lock) = match self.open(request) {
            Ok(opened) => opened,
            Err(error) => {
                tracing::error!(%error, "workflow failed before touching the repository");
                return finish(
                    state,
                    Status::Failed,
                    PushOutcome::NotAttempted,
                    Vec::new(),
                    vec![error],
                    None,
                );
            }
        };

        let timestamp = self.ctx.clock.now();
        let mut run = Run {
            ctx: &self.ctx,
            credentials: &self.credentials,
            request,
            git,
            lock,
            template: TemplateContext::new(request.design_name.clone(), timestamp),
            state,
            remote_url: request.repository.remote_url.clone(),
            artifacts: Vec::new(),
            changelog: None,
        };
        let result = run.drive();

        tracing::info!(
            status = %result.status,
            branch = ?result.branch.as_ref().map(BranchName::as_str),
            elapsed = %humantime::format_duration(round_to_millis(started.elapsed())),
            "push workflow finished"
        );
        result
    }

    /// Checks that need no git command: settings, repository layout, lock.
    fn open(&self, request: &PushRequest) -> Result<(GitClient, RunLock), WorkflowError> {
        let repo = &request.repository;
        let config_error = |message: String| {
            WorkflowError::new(ErrorKind::ConfigurationError, Phase::Validate, message)
        };

        repo.validate().map_err(|e| config_error(e.to_string()))?;
        let paths = RepoPaths::discover(&repo.local_path).map_err(|e| config_error(e.to_string()))?;
        let git = GitClient::new(
            self.ctx.runner.clone(),
            self.ctx.git_program.clone(),
            paths,
            self.ctx.timeouts,
        )
        .map_err(|e| git_error(Phase::Validate, e))?;

        let lock = RunLock::acquire(git.paths()).map_err(|e| match e {
            LockError::Busy { holder, .. } => WorkflowError::new(
                ErrorKind::RepositoryStateError,
                Phase::Validate,
                format!(
                    "another designsync run{} is in progress for {}",
                    holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default(),
                    repo.local_path.display()
                ),
            ),
            other => WorkflowError::new(ErrorKind::OperationError, Phase::Validate, other.to_string()),
        })?;
        Ok((git, lock))
    }
}

/// Control flow after Stage & Commit.
enum Completion {
    Pushed(PushMode),
    NothingToCommit,
}

/// One in-flight run.
struct Run<'a> {
    ctx: &'a WorkflowContext,
    credentials: &'a CredentialResolver,
    request: &'a PushRequest,
    git: GitClient,
    lock: RunLock,
    template: TemplateContext,
    state: WorkflowState,
    remote_url: String,
    /// Repo-relative artifact paths, `/`-separated.
    artifacts: Vec<String>,
    /// Repo-relative changelog path once an entry was written.
    changelog: Option<String>,
}

impl Run<'_> {
    fn drive(&mut self) -> WorkflowResult {
        let outcome = self.execute();
        let result = match outcome {
            Ok(completion) => self.succeed(completion),
            Err(error) => self.fail(error),
        };
        if let Err(e) = self.lock.release() {
            tracing::warn!(error = %e, "could not release repository lock");
        }
        result
    }

    fn execute(&mut self) -> Result<Completion, WorkflowError> {
        self.validate()?;
        self.step(Phase::Autostash)?;
        self.autostash()?;
        self.step(Phase::Pull)?;
        self.pull()?;
        self.step(Phase::Branch)?;
        self.branch()?;
        self.step(Phase::ExportConsume)?;
        self.export_consume()?;
        self.step(Phase::Changelog)?;
        let changed = self.changelog()?;
        self.step(Phase::StageCommit)?;
        if !changed {
            return Ok(Completion::NothingToCommit);
        }
        self.commit()?;
        self.step(Phase::Push)?;
        let mode = self.push()?;
        Ok(Completion::Pushed(mode))
    }

    /// Enter `phase`, honouring cancellation.
    fn step(&mut self, phase: Phase) -> Result<(), WorkflowError> {
        if phase.is_cancellable() && self.ctx.cancel.is_cancelled() {
            tracing::info!(before = %phase, "run cancelled");
            return Err(WorkflowError::new(
                ErrorKind::Cancelled,
                self.state.phase,
                format!("cancelled before {phase}"),
            ));
        }
        self.state.enter(phase);
        Ok(())
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> WorkflowError {
        WorkflowError::new(kind, self.state.phase, message)
    }

    fn git_failure(&self, what: &str, out: &GitOutput) -> WorkflowError {
        let kind = out.kind_or_unknown();
        self.error(ErrorKind::from_git(kind), format!("{what}: {}", out.message()))
            .with_git_kind(kind)
    }

    // =========================================================================
    // Phases
    // =========================================================================

    fn validate(&mut self) -> Result<(), WorkflowError> {
        let git = &self.git;
        let remote = self.request.repository.remote.clone();

        let in_progress = git.state();
        if let Some(kind) = in_progress.blocking_kind() {
            return Err(self
                .error(
                    ErrorKind::RepositoryStateError,
                    format!("a {in_progress} is already in progress"),
                )
                .with_git_kind(kind));
        }

        let out = git.current_branch().map_err(|e| git_error(Phase::Validate, e))?;
        if !out.ok {
            return Err(match out.kind {
                Some(GitErrorKind::NotARepository) => self
                    .error(ErrorKind::ConfigurationError, out.message())
                    .with_git_kind(GitErrorKind::NotARepository),
                _ => self
                    .error(
                        ErrorKind::RepositoryStateError,
                        "HEAD is detached; check out a branch first",
                    )
                    .with_git_kind(GitErrorKind::DetachedHead),
            });
        }
        let original = BranchName::new(out.stdout_trimmed()).map_err(|e| {
            self.error(ErrorKind::RepositoryStateError, e.to_string())
        })?;

        let out = git.head_oid().map_err(|e| git_error(Phase::Validate, e))?;
        let head = if out.ok { Oid::new(out.stdout_trimmed()).ok() } else { None };
        let Some(head) = head else {
            return Err(self.error(
                ErrorKind::RepositoryStateError,
                format!("branch {original} has no commits yet"),
            ));
        };

        let out = git.remotes().map_err(|e| git_error(Phase::Validate, e))?;
        if !out.ok || !out.stdout.lines().any(|line| line.trim() == remote) {
            return Err(self.error(
                ErrorKind::ConfigurationError,
                format!("remote '{remote}' is not configured in this repository"),
            ));
        }
        let out = git.remote_url(&remote).map_err(|e| git_error(Phase::Validate, e))?;
        if out.ok && !out.stdout_trimmed().is_empty() {
            self.remote_url = out.stdout_trimmed().to_string();
        }

        tracing::info!(branch = %original, head = %head.short(10), "repository ready");
        self.state.original_branch = Some(original);
        self.state.previous_head = Some(head);
        Ok(())
    }

    fn autostash(&mut self) -> Result<(), WorkflowError> {
        let out = self.git.status().map_err(|e| git_error(Phase::Autostash, e))?;
        if !out.ok {
            return Err(self.git_failure("could not read the working tree status", &out));
        }
        let status = WorktreeStatus::parse_porcelain(&out.stdout);
        if status.is_clean() {
            tracing::debug!("working tree clean; no autostash");
            return Ok(());
        }
        if status.has_conflicts {
            return Err(self
                .error(
                    ErrorKind::RepositoryStateError,
                    "the working tree has unresolved conflicts",
                )
                .with_git_kind(GitErrorKind::MergeConflict));
        }

        let before = self.git.stash_oid().map_err(|e| git_error(Phase::Autostash, e))?;
        let label = format!("{AUTOSTASH_LABEL} {}", self.template.timestamp_token());
        let out = self
            .git
            .stash_push(&label)
            .map_err(|e| git_error(Phase::Autostash, e))?;
        if !out.ok {
            return Err(self.git_failure("could not stash local changes", &out));
        }
        let after = self.git.stash_oid().map_err(|e| git_error(Phase::Autostash, e))?;

        match after {
            Some(oid) if Some(&oid) != before.as_ref() => {
                tracing::info!(
                    stash = %oid.short(10),
                    staged = status.staged,
                    unstaged = status.unstaged,
                    untracked = status.untracked,
                    "stashed local changes"
                );
                self.state.autostash = Some(oid);
                Ok(())
            }
            _ if is_nothing_to_stash(&out.stdout) || is_nothing_to_stash(&out.stderr) => {
                tracing::debug!("nothing to stash");
                Ok(())
            }
            _ => Err(self.error(
                ErrorKind::OperationError,
                "git reported success but no stash entry was created",
            )),
        }
    }

    fn pull(&mut self) -> Result<(), WorkflowError> {
        if self.request.skip_pull {
            tracing::info!("skipping pull");
            return Ok(());
        }
        let Some(branch) = self.state.original_branch.clone() else {
            return Ok(());
        };
        let remote = &self.request.repository.remote;

        let out = self
            .git
            .pull_rebase(remote, &branch)
            .map_err(|e| git_error(Phase::Pull, e))?;
        if out.ok {
            tracing::info!(%remote, %branch, "pulled latest changes");
            return Ok(());
        }
        if is_missing_remote_ref(&out.stderr) {
            self.state.warn(format!(
                "{remote} has no branch {branch}; skipped pull"
            ));
            return Ok(());
        }

        let kind = match out.kind_or_unknown() {
            GitErrorKind::Unknown if self.git.state().is_in_progress() => {
                GitErrorKind::MergeConflict
            }
            kind => kind,
        };
        let error_kind = match kind {
            GitErrorKind::MergeConflict
            | GitErrorKind::RebaseInProgress
            | GitErrorKind::DirtyWorkingTree => ErrorKind::ConflictError,
            other => ErrorKind::from_git(other),
        };
        Err(self
            .error(error_kind, format!("pull --rebase failed: {}", out.message()))
            .with_git_kind(kind))
    }

    fn branch(&mut self) -> Result<(), WorkflowError> {
        let repo = &self.request.repository;
        let branch = resolve_branch_name(
            &repo.branch_template,
            self.request.branch_override.as_deref(),
            &self.template,
        )
        .map_err(|e| self.error(ErrorKind::ConfigurationError, e.to_string()))?;

        let out = self
            .git
            .create_branch(&branch)
            .map_err(|e| git_error(Phase::Branch, e))?;
        if !out.ok {
            return Err(self.git_failure(&format!("could not create branch {branch}"), &out));
        }

        tracing::info!(%branch, "created branch");
        self.template = self.template.with_branch(&branch);
        self.state.branch = Some(branch);
        self.state.branch_created = true;
        Ok(())
    }

    fn export_consume(&mut self) -> Result<(), WorkflowError> {
        if self.request.files.is_empty() {
            self.state.warn("no artifact files were provided");
            return Ok(());
        }

        let subfolder = normalize_export_subfolder(&render(
            &self.request.repository.export_subfolder,
            &self.template,
        ))
        .map_err(|e| self.error(ErrorKind::ConfigurationError, e.to_string()))?;

        let mut plan: Vec<(PathBuf, String)> = Vec::with_capacity(self.request.files.len());
        for file in &self.request.files {
            if !file.source.is_file() {
                return Err(self.error(
                    ErrorKind::OperationError,
                    format!("artifact not found: {}", file.source.display()),
                ));
            }
            let relative = match &file.destination {
                Some(destination) => {
                    normalize_export_subfolder(&destination.to_string_lossy())
                        .map_err(|e| self.error(ErrorKind::ConfigurationError, e.to_string()))?
                }
                None => {
                    let Some(name) = file.source.file_name() else {
                        return Err(self.error(
                            ErrorKind::ConfigurationError,
                            format!("artifact has no file name: {}", file.source.display()),
                        ));
                    };
                    join_relative(&subfolder, &name.to_string_lossy())
                }
            };
            if relative.is_empty() {
                return Err(self.error(
                    ErrorKind::ConfigurationError,
                    format!("empty destination for {}", file.source.display()),
                ));
            }
            if plan.iter().any(|(_, existing)| *existing == relative) {
                return Err(self.error(
                    ErrorKind::ConfigurationError,
                    format!("two artifacts map to {relative}"),
                ));
            }
            plan.push((file.source.clone(), relative));
        }

        for (source, relative) in plan {
            let destination = self.git.paths().in_work_dir(Path::new(&relative));
            let existed = destination.exists();
            if !same_file(&source, &destination) {
                copy_artifact(&source, &destination).map_err(|e| {
                    self.error(
                        ErrorKind::OperationError,
                        format!("could not copy {} to {relative}: {e}", source.display()),
                    )
                })?;
            }
            tracing::debug!(source = %source.display(), %relative, "placed artifact");
            self.state.record_write(relative.clone(), existed);
            self.artifacts.push(relative);
        }
        tracing::info!(count = self.artifacts.len(), "copied artifacts into the working tree");
        Ok(())
    }

    /// Stage the artifacts and, if they changed, prepend a changelog entry.
    ///
    /// Returns whether anything changed. Artifacts are staged before the
    /// changelog is touched so an unchanged export writes no entry.
    fn changelog(&mut self) -> Result<bool, WorkflowError> {
        if self.artifacts.is_empty() {
            return Ok(false);
        }
        let out = self
            .git
            .add(&self.artifacts)
            .map_err(|e| git_error(Phase::Changelog, e))?;
        if !out.ok {
            return Err(self.git_failure("could not stage artifacts", &out));
        }
        match self
            .git
            .staged_diff(&self.artifacts)
            .map_err(|e| git_error(Phase::Changelog, e))?
        {
            StagedDiff::Unchanged => return Ok(false),
            StagedDiff::Changed => {}
            StagedDiff::Failed(out) => {
                return Err(self.git_failure("could not compare staged artifacts", &out))
            }
        }

        let repo = &self.request.repository;
        if !repo.changelog {
            return Ok(true);
        }
        let Some(branch) = self.state.branch.clone() else {
            return Ok(true);
        };

        let relative = repo.changelog_path.to_string_lossy().replace('\\', "/");
        let path = self.git.paths().in_work_dir(&repo.changelog_path);
        let existed = path.exists();
        let entry = ChangelogEntry {
            timestamp: self.template.timestamp,
            branch,
            message: self.commit_message(),
            files: self.artifacts.clone(),
        };
        changelog::prepend(&path, &entry)
            .map_err(|e| self.error(ErrorKind::OperationError, e.to_string()))?;
        self.state.record_write(relative.clone(), existed);
        self.changelog = Some(relative);
        Ok(true)
    }

    fn commit(&mut self) -> Result<(), WorkflowError> {
        if let Some(changelog) = self.changelog.clone() {
            let out = self
                .git
                .add(&[changelog])
                .map_err(|e| git_error(Phase::StageCommit, e))?;
            if !out.ok {
                return Err(self.git_failure("could not stage the changelog", &out));
            }
        }

        let message = self.commit_message();
        let out = self
            .git
            .commit(&message)
            .map_err(|e| git_error(Phase::StageCommit, e))?;
        if !out.ok {
            return Err(self.git_failure("commit failed", &out));
        }

        let out = self.git.head_oid().map_err(|e| git_error(Phase::StageCommit, e))?;
        let commit = if out.ok { Oid::new(out.stdout_trimmed()).ok() } else { None };
        match commit {
            Some(oid) => {
                tracing::info!(commit = %oid.short(10), "committed artifacts");
                self.state.commit = Some(oid);
                Ok(())
            }
            None => Err(self.error(
                ErrorKind::OperationError,
                "commit succeeded but HEAD could not be read",
            )),
        }
    }

    fn push(&mut self) -> Result<PushMode, WorkflowError> {
        let Some(branch) = self.state.branch.clone() else {
            return Err(self.error(ErrorKind::OperationError, "no branch to push"));
        };
        let remote = self.request.repository.remote.clone();

        let askpass = self.prepare_credentials()?;
        let git = match &askpass {
            Some(askpass) => self.git.with_env(askpass.env()),
            None => self.git.clone(),
        };

        let mut mode = PushMode::Plain;
        let mut out = self.push_once(&git, &remote, &branch, mode)?;

        if !out.ok && is_missing_upstream(&out.stderr) {
            tracing::info!(%branch, "no upstream; retrying with --set-upstream");
            mode = PushMode::SetUpstream;
            out = self.push_once(&git, &remote, &branch, mode)?;
        }

        if !out.ok && out.kind == Some(GitErrorKind::RemoteRejected) && self.request.force_push {
            tracing::warn!(%branch, "push rejected; retrying with --force-with-lease");
            mode = PushMode::ForceWithLease;
            out = self.push_once(&git, &remote, &branch, mode)?;
        }
        drop(askpass);

        if out.ok {
            tracing::info!(%remote, %branch, ?mode, "pushed");
            return Ok(mode);
        }

        let kind = out.kind_or_unknown();
        let message = match kind {
            GitErrorKind::AuthenticationFailed => format!(
                "{remote} rejected the credentials: {}; update them with `dsync auth {}`",
                out.message(),
                self.request.repository.name
            ),
            GitErrorKind::RemoteRejected if mode == PushMode::ForceWithLease => format!(
                "push rejected even with --force-with-lease: {}",
                out.message()
            ),
            GitErrorKind::RemoteRejected => format!(
                "push rejected: {}; pass --force to overwrite the remote branch",
                out.message()
            ),
            _ => format!("push failed: {}", out.message()),
        };
        Err(self.error(ErrorKind::from_git(kind), message).with_git_kind(kind))
    }

    fn push_once(
        &mut self,
        git: &GitClient,
        remote: &str,
        branch: &BranchName,
        mode: PushMode,
    ) -> Result<GitOutput, WorkflowError> {
        let out = git
            .push(remote, branch, mode)
            .map_err(|e| git_error(Phase::Push, e))?;
        self.state.push_attempts += 1;
        Ok(out)
    }

    /// Resolve a credential and wrap it in an askpass environment.
    fn prepare_credentials(&mut self) -> Result<Option<AskpassEnv>, WorkflowError> {
        let repo = &self.request.repository;
        let has_override = self
            .request
            .credential
            .token
            .as_ref()
            .is_some_and(|t| !t.is_empty());
        if !repo.use_stored_credential && !has_override {
            return Ok(None);
        }

        let identity = match RepoIdentity::parse(&self.remote_url) {
            Ok(identity) => identity,
            Err(e) => {
                self.state.warn(format!("not using stored credentials: {e}"));
                return Ok(None);
            }
        };
        if !identity.is_https() {
            self.state.warn(format!(
                "credentials apply to HTTPS remotes only; {identity} uses its own transport"
            ));
            return Ok(None);
        }

        let resolution =
            self.credentials
                .resolve(&identity, &self.request.credential, self.ctx.interactive);
        for warning in resolution.warnings {
            self.state.warn(warning);
        }
        let Some(credential) = resolution.credential else {
            return Ok(None);
        };

        tracing::debug!(%identity, source = %credential.source, "using credential");
        AskpassEnv::new(&credential).map(Some).map_err(|e| {
            self.error(
                ErrorKind::OperationError,
                format!("could not prepare the credential helper: {e}"),
            )
        })
    }

    // =========================================================================
    // Terminal states
    // =========================================================================

    fn succeed(&mut self, completion: Completion) -> WorkflowResult {
        let push = match completion {
            Completion::Pushed(mode) => PushOutcome::Pushed { mode },
            Completion::NothingToCommit => {
                self.state.warn("nothing to commit");
                PushOutcome::NothingToPush
            }
        };
        self.state.enter(Phase::Restore);

        if self.request.return_to_original_branch {
            if let Some(original) = self.state.original_branch.clone() {
                match self.git.checkout(&original) {
                    Ok(out) if out.ok => tracing::info!(branch = %original, "switched back"),
                    Ok(out) => self
                        .state
                        .warn(format!("could not switch back to {original}: {}", out.message())),
                    Err(e) => self
                        .state
                        .warn(format!("could not switch back to {original}: {e}")),
                }
            }
        }

        let mut errors = Vec::new();
        let (status, preserved) = match restore_autostash(&self.git, &mut self.state) {
            RestoreOutcome::Preserved { stash, message } => {
                errors.push(recovery_error(&stash, &message));
                (Status::PartialRecoveryNeeded, Some(stash))
            }
            _ => (Status::Success, None),
        };
        self.state.enter(Phase::Done);

        let files = self.committed_files(&push);
        finish(self.state.clone(), status, push, files, errors, preserved)
    }

    fn fail(&mut self, error: WorkflowError) -> WorkflowResult {
        tracing::error!(kind = %error.kind, phase = %error.phase, "{}", error.message);
        let failed_at = self.state.phase;
        let mut errors = vec![error];

        let push = if failed_at == Phase::Push && self.state.push_attempts > 0 {
            PushOutcome::Failed
        } else {
            PushOutcome::NotAttempted
        };

        let mut rebase_stuck = false;
        if failed_at >= Phase::Pull {
            rebase_stuck = !abort_rebase(&self.git, &mut self.state);
        }
        if failed_at < Phase::Push {
            undo_branch(&self.git, &mut self.state);
        }

        let mut preserved = None;
        if rebase_stuck {
            if let Some(oid) = self.state.autostash.clone() {
                let stash = PreservedStash { oid, selector: None };
                errors.push(recovery_error(
                    &stash,
                    "a rebase is still in progress, so the stash was not applied",
                ));
                preserved = Some(stash);
            } else {
                errors.push(self.error(
                    ErrorKind::RecoveryError,
                    "the rebase could not be aborted; run `git rebase --abort` manually",
                ));
            }
        } else {
            self.state.enter(Phase::Restore);
            if let RestoreOutcome::Preserved { stash, message } =
                restore_autostash(&self.git, &mut self.state)
            {
                errors.push(recovery_error(&stash, &message));
                preserved = Some(stash);
            }
        }

        let status = if preserved.is_some() || rebase_stuck {
            Status::PartialRecoveryNeeded
        } else {
            Status::Failed
        };
        let files = if self.state.commit.is_some() {
            self.committed_files(&push)
        } else {
            Vec::new()
        };
        finish(self.state.clone(), status, push, files, errors, preserved)
    }

    fn committed_files(&self, push: &PushOutcome) -> Vec<String> {
        if *push == PushOutcome::NothingToPush {
            return Vec::new();
        }
        let mut files = self.artifacts.clone();
        files.extend(self.changelog.clone());
        files
    }

    /// The rendered commit message.
    fn commit_message(&self) -> String {
        let raw = if self.request.message.trim().is_empty() {
            &self.request.repository.commit_template
        } else {
            &self.request.message
        };
        let rendered = render(raw, &self.template);
        if rendered.trim().is_empty() {
            render(DEFAULT_COMMIT_TEMPLATE, &self.template)
        } else {
            rendered
        }
    }
}

fn finish(
    state: WorkflowState,
    status: Status,
    push: PushOutcome,
    files: Vec<String>,
    errors: Vec<WorkflowError>,
    preserved_stash: Option<PreservedStash>,
) -> WorkflowResult {
    WorkflowResult {
        status,
        branch: state.branch,
        commit: state.commit,
        push,
        files,
        warnings: state.warnings,
        errors,
        preserved_stash,
    }
}

fn recovery_error(stash: &PreservedStash, message: &str) -> WorkflowError {
    WorkflowError::new(
        ErrorKind::RecoveryError,
        Phase::Restore,
        format!(
            "uncommitted changes are preserved in {} ({}): {message}",
            stash.reference(),
            stash.oid.short(10)
        ),
    )
}

fn git_error(phase: Phase, error: GitError) -> WorkflowError {
    let kind = match error {
        GitError::MissingRoot { .. } => ErrorKind::ConfigurationError,
        GitError::Process(_) => ErrorKind::OperationError,
    };
    WorkflowError::new(kind, phase, error.to_string())
}

fn join_relative(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_artifact(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;
    Ok(())
}

fn round_to_millis(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(duration.as_millis() as u64)
}
