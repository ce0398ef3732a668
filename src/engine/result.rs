//! engine::result
//!
//! The structured outcome of a run.
//!
//! # Error Taxonomy
//!
//! Every fatal error carries one [`ErrorKind`] and a fixed remediation
//! paragraph for that kind. The run never returns a bare error: failures,
//! warnings and partial recovery all end up in a [`WorkflowResult`].

use std::fmt;

use super::state::Phase;
use crate::core::types::{BranchName, Oid};
use crate::git::{GitErrorKind, PushMode};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Pushed, or nothing to commit.
    Success,
    /// No remote change; the local repository left as clean as possible.
    Failed,
    /// The autostash could not be restored (or a rebase could not be
    /// aborted). Reported apart from ordinary failure whatever the push did.
    PartialRecoveryNeeded,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Success => "success",
            Status::Failed => "failed",
            Status::PartialRecoveryNeeded => "partial recovery needed",
        })
    }
}

/// Kind of a fatal workflow error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing repository configuration.
    ConfigurationError,
    /// Detached HEAD, operation in progress, concurrent run.
    RepositoryStateError,
    NetworkError,
    AuthenticationError,
    /// Rebase or merge conflict during pull.
    ConflictError,
    /// The autostash could not be restored.
    RecoveryError,
    /// Unclassified git failure or local I/O failure inside a phase.
    OperationError,
    /// The remote refused a non-forced push.
    PushRejected,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "configuration error",
            ErrorKind::RepositoryStateError => "repository state error",
            ErrorKind::NetworkError => "network error",
            ErrorKind::AuthenticationError => "authentication error",
            ErrorKind::ConflictError => "conflict",
            ErrorKind::RecoveryError => "recovery error",
            ErrorKind::OperationError => "operation error",
            ErrorKind::PushRejected => "push rejected",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// One-paragraph guidance shown with the error.
    pub fn remediation(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => {
                "Check the repository settings: localPath must be an absolute path to a \
                 git working tree (or a new directory to clone into), remoteUrl must be set, \
                 and the configured remote must exist. Fix the entry with `dsync repo add` \
                 and run again. No git command was run."
            }
            ErrorKind::RepositoryStateError => {
                "The repository is not in a state this tool can safely work from. Check out \
                 a branch if HEAD is detached, finish or abort any rebase or merge in progress \
                 (`git rebase --continue` / `git rebase --abort`, `git merge --abort`), or wait \
                 for the other run to finish. Nothing was changed."
            }
            ErrorKind::NetworkError => {
                "The remote could not be reached. Check the network connection and the \
                 remote URL, then run again. Your uncommitted work was restored."
            }
            ErrorKind::AuthenticationError => {
                "The remote refused the credentials. Update the stored token with \
                 `dsync auth <repo> --token`, or pass --token/--username (DESIGNSYNC_TOKEN) \
                 for this run, and make sure the token can push to the repository."
            }
            ErrorKind::ConflictError => {
                "Pulling the latest changes produced conflicts. The rebase was aborted and \
                 your uncommitted work restored. Resolve the divergence manually (for example \
                 `git pull --rebase`, fix the conflicts, `git rebase --continue`), then run \
                 again, or use --skip-pull."
            }
            ErrorKind::RecoveryError => {
                "Your uncommitted work could not be restored automatically and is still saved \
                 in the stash listed above. Resolve any conflicting files, then run \
                 `git stash apply <stash>` and drop the entry once you are satisfied. Do not \
                 run `git stash drop` or `git stash clear` before that."
            }
            ErrorKind::OperationError => {
                "A step failed unexpectedly. The message above contains git's output. \
                 Changes made by this run were rolled back where possible; run again with \
                 --debug for the full command log."
            }
            ErrorKind::PushRejected => {
                "The remote rejected the push, usually because the branch already exists \
                 there with different history. The commit is kept on the local branch. Choose \
                 a different branch name, or run again with --force to overwrite it with \
                 --force-with-lease."
            }
            ErrorKind::Cancelled => {
                "The run was cancelled before anything was pushed. Local changes made by the \
                 run were rolled back and your uncommitted work restored."
            }
        }
    }

    /// Map a git failure kind seen during pull or push.
    pub fn from_git(kind: GitErrorKind) -> Self {
        match kind {
            GitErrorKind::NotARepository => ErrorKind::ConfigurationError,
            GitErrorKind::DetachedHead | GitErrorKind::RebaseInProgress => {
                ErrorKind::RepositoryStateError
            }
            GitErrorKind::MergeConflict | GitErrorKind::DirtyWorkingTree => {
                ErrorKind::ConflictError
            }
            GitErrorKind::AuthenticationFailed => ErrorKind::AuthenticationError,
            GitErrorKind::RemoteRejected => ErrorKind::PushRejected,
            GitErrorKind::NetworkUnreachable => ErrorKind::NetworkError,
            GitErrorKind::Unknown => ErrorKind::OperationError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowError {
    pub kind: ErrorKind,
    pub phase: Phase,
    pub message: String,
    /// The git classification behind the error, if any.
    pub git_kind: Option<GitErrorKind>,
}

impl WorkflowError {
    pub fn new(kind: ErrorKind, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            message: message.into(),
            git_kind: None,
        }
    }

    pub fn with_git_kind(mut self, kind: GitErrorKind) -> Self {
        self.git_kind = Some(kind);
        self
    }

    pub fn remediation(&self) -> &'static str {
        self.kind.remediation()
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}: {}", self.kind, self.phase, self.message)
    }
}

/// What happened at the Push phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The run stopped before Push.
    NotAttempted,
    /// Nothing changed, so there was nothing to push.
    NothingToPush,
    Pushed { mode: PushMode },
    Failed,
}

/// An autostash left in place for manual recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedStash {
    pub oid: Oid,
    /// `stash@{n}` when the entry could be located.
    pub selector: Option<String>,
}

impl PreservedStash {
    /// The reference to give `git stash apply`.
    pub fn reference(&self) -> String {
        self.selector
            .clone()
            .unwrap_or_else(|| self.oid.as_str().to_string())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub status: Status,
    pub branch: Option<BranchName>,
    pub commit: Option<Oid>,
    pub push: PushOutcome,
    /// Repo-relative paths committed (artifacts and changelog).
    pub files: Vec<String>,
    pub warnings: Vec<String>,
    /// Primary error first.
    pub errors: Vec<WorkflowError>,
    pub preserved_stash: Option<PreservedStash>,
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// The error that decided the status.
    pub fn primary_error(&self) -> Option<&WorkflowError> {
        self.errors.first()
    }

    /// Whether the run ended without the "nothing to commit" no-op.
    pub fn committed(&self) -> bool {
        self.commit.is_some()
    }
}
