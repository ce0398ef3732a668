//! engine
//!
//! The publishing workflow: Validate -> Autostash -> Pull -> Branch ->
//! Export-consume -> Changelog -> Stage & Commit -> Push -> Restore.
//!
//! # Architecture
//!
//! [`WorkflowEngine`] consumes a [`PushRequest`] and drives the git client,
//! branch naming, changelog writer and credential resolver through the
//! phases in order, producing a [`WorkflowResult`]. All process-wide
//! inputs (git executable, timeouts, interactivity, cancellation, clock)
//! live in one [`WorkflowContext`] built at startup and passed in.
//!
//! # Invariants
//!
//! - `run` never returns `Err` and never panics on git failures; every
//!   path ends in a structured result
//! - Nothing destructive happens before the autostash exists
//! - An autostash is restored or reported, never dropped
//! - Only one run per repository at a time (see [`RunLock`])
//! - Cancellation is honoured only before the Push phase
//!
//! [`RunLock`]: crate::core::ops::RunLock
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use designsync::auth::CredentialResolver;
//! use designsync::core::config::RepositoryConfigStore;
//! use designsync::engine::{PushRequest, WorkflowContext, WorkflowEngine};
//! use designsync::secrets::MemorySecretStore;
//!
//! let store = RepositoryConfigStore::load(&RepositoryConfigStore::default_path()?)?;
//! let repo = store.get("bracket")?;
//! let request = PushRequest::new(repo, "Bracket").with_files(["/tmp/out/Bracket.step"]);
//!
//! let engine = WorkflowEngine::new(
//!     WorkflowContext::from_env(),
//!     CredentialResolver::new(Arc::new(MemorySecretStore::new())),
//! );
//! let result = engine.run(&request);
//! println!("{}", result.status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod request;
pub mod result;
pub mod rollback;
pub mod state;
pub mod workflow;

pub use request::{ArtifactFile, PushRequest};
pub use result::{ErrorKind, PreservedStash, PushOutcome, Status, WorkflowError, WorkflowResult};
pub use state::{Phase, WorkflowState};
pub use workflow::WorkflowEngine;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::git::{resolve_git_program, ProcessRunner, SystemProcessRunner, Timeouts, GIT_PROGRAM_ENV};

/// Cooperative cancellation flag, shared between the caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next phase boundary
    /// before Push.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of the local wall-clock time used in templates and changelog
/// entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Everything a run needs from its environment.
#[derive(Clone)]
pub struct WorkflowContext {
    /// Git executable, resolved once at startup.
    pub git_program: PathBuf,
    pub timeouts: Timeouts,
    /// Whether a human can answer prompts.
    pub interactive: bool,
    pub cancel: CancelToken,
    pub clock: Arc<dyn Clock>,
    pub runner: Arc<dyn ProcessRunner>,
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("git_program", &self.git_program)
            .field("timeouts", &self.timeouts)
            .field("interactive", &self.interactive)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl WorkflowContext {
    /// Context with default timeouts, the system clock and real processes.
    pub fn new(git_program: PathBuf) -> Self {
        Self {
            git_program,
            timeouts: Timeouts::default(),
            interactive: false,
            cancel: CancelToken::new(),
            clock: Arc::new(SystemClock),
            runner: Arc::new(SystemProcessRunner),
        }
    }

    /// Like [`new`](Self::new), with the git executable taken from
    /// `DESIGNSYNC_GIT` or the search path.
    pub fn from_env() -> Self {
        Self::new(resolve_git_program(std::env::var_os(GIT_PROGRAM_ENV)))
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let ctx = WorkflowContext::new("git".into()).with_cancel(token.clone());
        assert!(!ctx.cancel.is_cancelled());
        token.cancel();
        assert!(ctx.cancel.is_cancelled());
    }

    #[test]
    fn fixed_clock() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        let ctx = WorkflowContext::new("git".into()).with_clock(Arc::new(FixedClock(at)));
        assert_eq!(ctx.clock.now(), at);
    }
}
