//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results
//! go to stdout; warnings and errors go to stderr. Errors are always
//! shown, even in quiet mode.

use std::fmt::Display;

use crate::engine::{PushOutcome, Status, WorkflowResult};
use crate::git::PushMode;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the summary of a run.
pub fn format_result(result: &WorkflowResult) -> String {
    let mut lines = Vec::new();
    let headline = match (result.status, result.push) {
        (Status::Success, PushOutcome::NothingToPush) => "Nothing to commit; nothing pushed.".to_string(),
        (Status::Success, _) => "Pushed successfully.".to_string(),
        (Status::Failed, _) => "Push failed.".to_string(),
        (Status::PartialRecoveryNeeded, _) => {
            "Finished, but your uncommitted changes need manual recovery.".to_string()
        }
    };
    lines.push(headline);

    if let Some(branch) = &result.branch {
        lines.push(format!("  branch:  {branch}"));
    }
    if let Some(commit) = &result.commit {
        lines.push(format!("  commit:  {}", commit.short(12)));
    }
    match result.push {
        PushOutcome::Pushed { mode } => lines.push(format!(
            "  push:    {}",
            match mode {
                PushMode::Plain => "pushed",
                PushMode::SetUpstream => "pushed (upstream set)",
                PushMode::ForceWithLease => "force-pushed with lease",
            }
        )),
        PushOutcome::Failed => lines.push("  push:    failed".to_string()),
        PushOutcome::NotAttempted | PushOutcome::NothingToPush => {}
    }
    if !result.files.is_empty() {
        lines.push("  files:".to_string());
        lines.push(format_list(&result.files, "    - "));
    }
    if let Some(stash) = &result.preserved_stash {
        lines.push(format!("  stash:   {} ({})", stash.reference(), stash.oid));
    }
    lines.join("\n")
}

/// Print a run's warnings, errors and summary.
pub fn print_result(result: &WorkflowResult, verbosity: Verbosity) {
    for warning in &result.warnings {
        warn(warning, verbosity);
    }
    for err in &result.errors {
        error(err);
    }
    if let Some(primary) = result.primary_error() {
        eprintln!();
        eprintln!("{}", primary.remediation());
        if result.preserved_stash.is_some() && primary.kind != crate::engine::ErrorKind::RecoveryError {
            eprintln!();
            eprintln!("{}", crate::engine::ErrorKind::RecoveryError.remediation());
        }
    }
    if verbosity != Verbosity::Quiet || result.status != Status::Success {
        println!("{}", format_result(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, Oid};
    use crate::engine::PreservedStash;

    fn result(status: Status, push: PushOutcome) -> WorkflowResult {
        WorkflowResult {
            status,
            branch: Some(BranchName::new("export/Wing-20240309-140500").unwrap()),
            commit: Some(Oid::new("a".repeat(40)).unwrap()),
            push,
            files: vec!["exports/Wing.step".into(), "CHANGELOG.md".into()],
            warnings: Vec::new(),
            errors: Vec::new(),
            preserved_stash: None,
        }
    }

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn success_summary() {
        let text = format_result(&result(
            Status::Success,
            PushOutcome::Pushed {
                mode: PushMode::SetUpstream,
            },
        ));
        insta::assert_snapshot!(text, @r###"
        Pushed successfully.
          branch:  export/Wing-20240309-140500
          commit:  aaaaaaaaaaaa
          push:    pushed (upstream set)
          files:
            - exports/Wing.step
            - CHANGELOG.md
        "###);
    }

    #[test]
    fn partial_recovery_names_stash() {
        let mut r = result(Status::PartialRecoveryNeeded, PushOutcome::Failed);
        r.preserved_stash = Some(PreservedStash {
            oid: Oid::new("b".repeat(40)).unwrap(),
            selector: Some("stash@{0}".into()),
        });
        let text = format_result(&r);
        assert!(text.contains("manual recovery"));
        assert!(text.contains("stash@{0}"));
    }
}
