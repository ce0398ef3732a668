//! designsync
//!
//! Publishes exported design files (STEP, STL, 3MF and the like) from a
//! CAD exporter to a git remote on a fresh branch. The working tree may
//! hold uncommitted edits; a run stashes them, pulls, branches, copies
//! the exports in, records a changelog entry, commits, pushes and then
//! puts the user back where they were.
//!
//! `dsync` (the binary) is a thin layer over [`engine::WorkflowEngine`].
//! Hosts embedding the library build a [`engine::PushRequest`], pick a
//! [`secrets::SecretStore`] and read the [`engine::WorkflowResult`].
//!
//! A run either restores the user's stashed edits or names the stash it
//! left behind. Tokens reach git only through the environment of the
//! child process.

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod secrets;
pub mod ui;
