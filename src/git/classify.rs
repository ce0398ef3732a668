//! git::classify
//!
//! Map failed git invocations onto a small set of failure kinds.
//!
//! Classification is substring matching on git's English messages (the
//! client forces `LC_ALL=C`), checked in a fixed order: authentication
//! before remote rejection before network, so an SSH "Permission denied"
//! followed by "Could not read from remote repository" reads as an
//! authentication failure, not a network one.

use std::fmt;

/// Why a git command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitErrorKind {
    NotARepository,
    DirtyWorkingTree,
    DetachedHead,
    RebaseInProgress,
    MergeConflict,
    AuthenticationFailed,
    RemoteRejected,
    NetworkUnreachable,
    Unknown,
}

impl GitErrorKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            GitErrorKind::NotARepository => "not-a-repository",
            GitErrorKind::DirtyWorkingTree => "dirty-working-tree",
            GitErrorKind::DetachedHead => "detached-head",
            GitErrorKind::RebaseInProgress => "rebase-in-progress",
            GitErrorKind::MergeConflict => "merge-conflict",
            GitErrorKind::AuthenticationFailed => "authentication-failed",
            GitErrorKind::RemoteRejected => "remote-rejected",
            GitErrorKind::NetworkUnreachable => "network-unreachable",
            GitErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PATTERNS: &[(GitErrorKind, &[&str])] = &[
    (GitErrorKind::NotARepository, &["not a git repository"]),
    (
        GitErrorKind::AuthenticationFailed,
        &[
            "authentication failed",
            "could not read username",
            "could not read password",
            "terminal prompts disabled",
            "invalid username or password",
            "permission denied (publickey",
            "password authentication was removed",
            "the requested url returned error: 401",
            "the requested url returned error: 403",
            "permission to ",
        ],
    ),
    (
        GitErrorKind::RemoteRejected,
        &[
            "[rejected]",
            "[remote rejected]",
            "non-fast-forward",
            "updates were rejected",
            "failed to push some refs",
            "stale info",
        ],
    ),
    (
        GitErrorKind::NetworkUnreachable,
        &[
            "could not resolve host",
            "could not resolve hostname",
            "failed to connect",
            "connection refused",
            "connection timed out",
            "operation timed out",
            "network is unreachable",
            "no route to host",
            "could not read from remote repository",
            "unable to access",
            "does not appear to be a git repository",
            "early eof",
        ],
    ),
    (
        GitErrorKind::RebaseInProgress,
        &[
            "rebase-merge directory",
            "rebase-apply directory",
            "rebase in progress",
            "middle of another rebase",
        ],
    ),
    (
        GitErrorKind::DirtyWorkingTree,
        &[
            "would be overwritten",
            "you have unstaged changes",
            "your index contains uncommitted changes",
            "please commit or stash them",
        ],
    ),
    (
        GitErrorKind::MergeConflict,
        &[
            "conflict (",
            "merge conflict",
            "could not apply",
            "resolve all conflicts",
            "you have not concluded your merge",
            "unmerged files",
        ],
    ),
    (
        GitErrorKind::DetachedHead,
        &["not currently on a branch", "head detached"],
    ),
];

/// Classify a finished git invocation.
///
/// Returns `None` for success. A timeout is always a network failure,
/// since only remote operations run long enough to hit one.
///
/// # Example
///
/// ```
/// use designsync::git::{classify, GitErrorKind};
///
/// assert_eq!(classify(Some(0), "", "", false), None);
/// assert_eq!(
///     classify(Some(128), "fatal: Authentication failed for 'https://h/o/r.git/'", "", false),
///     Some(GitErrorKind::AuthenticationFailed)
/// );
/// ```
pub fn classify(
    exit_code: Option<i32>,
    stderr: &str,
    stdout: &str,
    timed_out: bool,
) -> Option<GitErrorKind> {
    if timed_out {
        return Some(GitErrorKind::NetworkUnreachable);
    }
    if exit_code == Some(0) {
        return None;
    }

    let haystack = format!("{stderr}\n{stdout}").to_ascii_lowercase();
    let kind = PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| haystack.contains(needle)))
        .map(|(kind, _)| *kind)
        .unwrap_or(GitErrorKind::Unknown);
    Some(kind)
}

/// The pull named a branch the remote does not have.
pub fn is_missing_remote_ref(stderr: &str) -> bool {
    stderr
        .to_ascii_lowercase()
        .contains("couldn't find remote ref")
}

/// The push failed only because the branch has no upstream.
pub fn is_missing_upstream(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("has no upstream branch") || stderr.contains("--set-upstream")
}

/// `stash push` found nothing to save.
pub fn is_nothing_to_stash(output: &str) -> bool {
    output.contains("No local changes to save")
}
