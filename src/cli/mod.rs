//! cli
//!
//! Command-line interface layer for designsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging
//! - Delegate to command handlers and map their outcome to an exit code
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, resolves the
//! repository config and credentials, and hands a [`PushRequest`] to the
//! [`WorkflowEngine`]. All repository changes flow through the engine.
//!
//! [`PushRequest`]: crate::engine::PushRequest
//! [`WorkflowEngine`]: crate::engine::WorkflowEngine

pub mod args;
pub mod commands;

use std::path::PathBuf;

pub use args::{Cli, Command, Shell};

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::config::RepositoryConfigStore;
use crate::git::Timeouts;
use crate::ui::output::Verbosity;

/// Process exit codes.
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const FAILED: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const PARTIAL_RECOVERY: u8 = 3;
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub interactive: bool,
    pub timeouts: Timeouts,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_path: cli.config.clone(),
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            interactive: cli.interactive(),
            timeouts: Timeouts {
                local: cli.timeout,
                network: cli.network_timeout,
            },
        }
    }

    /// Load the repository config store.
    pub fn load_store(&self) -> Result<RepositoryConfigStore> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => RepositoryConfigStore::default_path()?,
        };
        Ok(RepositoryConfigStore::load(&path)?)
    }
}

/// Install the tracing subscriber. Logs go to stderr.
///
/// `RUST_LOG` takes precedence over the flags.
pub fn init_logging(debug: bool, quiet: bool) {
    let default = if debug {
        "designsync=debug"
    } else if quiet {
        "designsync=error"
    } else {
        "designsync=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

/// Run the CLI application and return the process exit code.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<u8> {
    let ctx = Context::from_cli(&cli);
    commands::dispatch(cli.command, &ctx)
}
