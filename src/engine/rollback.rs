//! engine::rollback
//!
//! Undoing a run's local changes and restoring the autostash.
//!
//! # Rollback Scopes
//!
//! - Failure during Pull: abort the rebase if one is in progress, then
//!   restore the autostash. If the abort fails the stash stays put.
//! - Failure after the branch exists but before Push: reset the paths the
//!   run wrote, check the original branch out, delete the new branch, then
//!   restore the autostash.
//! - Failure at Push: keep the commit and branch so the push can be
//!   retried, restore the autostash.
//!
//! # Stash Safety
//!
//! The autostash is identified by commit id, not by position, so stashes
//! created by someone else in the meantime are never popped. A stash that
//! cannot be popped is never dropped; it is reported as a
//! [`PreservedStash`].

use super::result::PreservedStash;
use super::state::WorkflowState;
use crate::core::types::Oid;
use crate::git::{GitClient, GitState};

/// Result of trying to restore the autostash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No autostash was pending.
    NotNeeded,
    Restored,
    /// The stash is still in the stash list.
    Preserved {
        stash: PreservedStash,
        message: String,
    },
}

/// Pop the autostash recorded in `state`, if any.
///
/// Tries `stash pop --index` first and falls back to a plain pop only when
/// git says the index cannot be reinstated.
pub fn restore_autostash(git: &GitClient, state: &mut WorkflowState) -> RestoreOutcome {
    let Some(oid) = state.autostash.clone() else {
        return RestoreOutcome::NotNeeded;
    };

    let entries = match git.stash_list() {
        Ok((out, entries)) if out.ok => entries,
        Ok((out, _)) => return preserved(oid, None, out.message()),
        Err(e) => return preserved(oid, None, e.to_string()),
    };
    let Some(entry) = entries.into_iter().find(|entry| entry.oid == oid) else {
        return preserved(
            oid,
            None,
            "the autostash is no longer in the stash list".to_string(),
        );
    };

    let popped = match git.stash_pop(&entry.selector, true) {
        Ok(out) if !out.ok && out.stderr.to_ascii_lowercase().contains("without --index") => {
            tracing::debug!("index could not be reinstated; popping without --index");
            git.stash_pop(&entry.selector, false)
        }
        other => other,
    };

    match popped {
        Ok(out) if out.ok => {
            tracing::info!(stash = %oid.short(10), "restored uncommitted changes");
            state.autostash = None;
            RestoreOutcome::Restored
        }
        Ok(out) => preserved(oid, Some(entry.selector), out.message()),
        Err(e) => preserved(oid, Some(entry.selector), e.to_string()),
    }
}

fn preserved(oid: Oid, selector: Option<String>, message: String) -> RestoreOutcome {
    tracing::error!(stash = %oid, selector = ?selector, %message, "autostash could not be restored");
    RestoreOutcome::Preserved {
        stash: PreservedStash { oid, selector },
        message,
    }
}

/// Abort a rebase left behind by the pull.
///
/// Returns `false` if a rebase is still in progress afterwards.
pub fn abort_rebase(git: &GitClient, state: &mut WorkflowState) -> bool {
    if git.state() != GitState::Rebase {
        return true;
    }
    match git.rebase_abort() {
        Ok(out) if out.ok => {
            tracing::info!("aborted the conflicting rebase");
            true
        }
        Ok(out) => {
            state.warn(format!("could not abort the rebase: {}", out.message()));
            false
        }
        Err(e) => {
            state.warn(format!("could not abort the rebase: {e}"));
            false
        }
    }
}

/// Remove everything the run did since creating its branch.
///
/// Returns `true` when the original branch is checked out again and the
/// run's branch is gone. Problems become warnings.
pub fn undo_branch(git: &GitClient, state: &mut WorkflowState) -> bool {
    if !state.branch_created {
        return true;
    }
    let Some(branch) = state.branch.clone() else {
        return true;
    };

    let mut clean = true;
    match git.reset_hard() {
        Ok(out) if out.ok => {}
        Ok(out) => {
            state.warn(format!("could not reset {branch}: {}", out.message()));
            clean = false;
        }
        Err(e) => {
            state.warn(format!("could not reset {branch}: {e}"));
            clean = false;
        }
    }

    let leftovers: Vec<String> = state
        .created
        .iter()
        .filter(|path| git.paths().in_work_dir(std::path::Path::new(path)).exists())
        .cloned()
        .collect();
    if !leftovers.is_empty() {
        match git.clean_paths(&leftovers) {
            Ok(out) if out.ok => {}
            Ok(out) => {
                state.warn(format!("could not remove exported files: {}", out.message()));
                clean = false;
            }
            Err(e) => {
                state.warn(format!("could not remove exported files: {e}"));
                clean = false;
            }
        }
    }

    let Some(original) = state.original_branch.clone() else {
        return false;
    };
    match git.checkout(&original) {
        Ok(out) if out.ok => {}
        Ok(out) => {
            state.warn(format!(
                "could not switch back to {original}: {}",
                out.message()
            ));
            return false;
        }
        Err(e) => {
            state.warn(format!("could not switch back to {original}: {e}"));
            return false;
        }
    }

    match git.delete_branch(&branch) {
        Ok(out) if out.ok => {
            tracing::info!(%branch, "removed branch created by this run");
            state.branch_created = false;
        }
        Ok(out) => {
            state.warn(format!("could not delete branch {branch}: {}", out.message()));
            clean = false;
        }
        Err(e) => {
            state.warn(format!("could not delete branch {branch}: {e}"));
            clean = false;
        }
    }
    clean
}
