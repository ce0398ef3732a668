//! git
//!
//! Single interface for all git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to git. Everything runs the git
//! executable through a [`ProcessRunner`]; no other module spawns git or
//! reads git's internal files beyond the state markers in
//! [`GitClient::state`].
//!
//! # Modules
//!
//! - `runner` - process execution with timeout and output capture
//! - `classify` - failure kinds from exit code and stderr
//! - `interface` - [`GitClient`], the typed operations
//!
//! # Invariants
//!
//! - Expected git failures are values ([`GitOutput`]), never `Err`
//! - Credentials travel only as environment overrides
//! - Every invocation is logged at debug level without env values
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use designsync::core::paths::RepoPaths;
//! use designsync::git::{GitClient, SystemProcessRunner, Timeouts};
//!
//! let paths = RepoPaths::discover(Path::new("/repo")).unwrap();
//! let git = GitClient::new(
//!     Arc::new(SystemProcessRunner),
//!     "git".into(),
//!     paths,
//!     Timeouts::default(),
//! )
//! .unwrap();
//! let out = git.current_branch().unwrap();
//! if out.ok {
//!     println!("on {}", out.stdout_trimmed());
//! }
//! ```

mod classify;
mod interface;
mod runner;

pub use classify::{
    classify, is_missing_remote_ref, is_missing_upstream, is_nothing_to_stash, GitErrorKind,
};
pub use interface::{
    clone_repository, GitClient, GitError, GitOutput, GitState, PushMode, StagedDiff, StashEntry,
    Timeouts, WorktreeStatus,
};
pub use runner::{
    resolve_git_program, CommandSpec, ProcessError, ProcessOutput, ProcessRunner,
    SystemProcessRunner, GIT_PROGRAM_ENV,
};
