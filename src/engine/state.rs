//! engine::state
//!
//! Mutable bookkeeping owned by one run.

use std::fmt;

use crate::core::types::{BranchName, Oid};

/// Workflow phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Validate,
    Autostash,
    Pull,
    Branch,
    ExportConsume,
    Changelog,
    StageCommit,
    Push,
    Restore,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Autostash => "autostash",
            Phase::Pull => "pull",
            Phase::Branch => "branch",
            Phase::ExportConsume => "export",
            Phase::Changelog => "changelog",
            Phase::StageCommit => "commit",
            Phase::Push => "push",
            Phase::Restore => "restore",
            Phase::Done => "done",
        }
    }

    /// Whether a pending cancellation stops the run on entering this
    /// phase. Push is the last such boundary; once issued a push runs to
    /// completion.
    pub fn is_cancellable(self) -> bool {
        self <= Phase::Push
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the run has done so far, used to decide how to unwind.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub phase: Phase,
    /// HEAD before anything ran.
    pub previous_head: Option<Oid>,
    pub original_branch: Option<BranchName>,
    /// Commit id of the autostash while it still needs restoring.
    pub autostash: Option<Oid>,
    pub branch: Option<BranchName>,
    pub branch_created: bool,
    /// Repo-relative paths the run wrote.
    pub written: Vec<String>,
    /// The subset of `written` that did not exist before.
    pub created: Vec<String>,
    pub commit: Option<Oid>,
    /// `git push` invocations that ran to completion, successful or not.
    pub push_attempts: u32,
    pub warnings: Vec<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Validate,
            previous_head: None,
            original_branch: None,
            autostash: None,
            branch: None,
            branch_created: false,
            written: Vec::new(),
            created: Vec::new(),
            commit: None,
            push_attempts: 0,
            warnings: Vec::new(),
        }
    }

    /// Move to `phase`.
    pub fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Record a path written by the export step.
    pub fn record_write(&mut self, relative: String, existed: bool) {
        if !existed {
            self.created.push(relative.clone());
        }
        self.written.push(relative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_stops_at_push_boundary() {
        assert!(Phase::Validate.is_cancellable());
        assert!(Phase::StageCommit.is_cancellable());
        assert!(Phase::Push.is_cancellable());
        assert!(!Phase::Restore.is_cancellable());
    }

    #[test]
    fn record_write_tracks_created() {
        let mut state = WorkflowState::new();
        state.record_write("exports/a.step".into(), false);
        state.record_write("exports/b.step".into(), true);
        assert_eq!(state.written.len(), 2);
        assert_eq!(state.created, ["exports/a.step"]);
    }
}
