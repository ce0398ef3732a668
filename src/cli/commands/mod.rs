//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Loads the config store and builds what the engine needs
//! 3. Formats and displays output
//!
//! Handlers return the process exit code; `Err` is for failures outside a
//! workflow run (unreadable config, unknown repository, bad arguments).

mod auth;
mod completion;
mod push;
mod repo;

pub use auth::auth;
pub use completion::completion;
pub use push::push;
pub use repo::{repo_add, repo_list, repo_show};

use std::sync::Arc;

use anyhow::Result;

use super::args::{Command, RepoCommand};
use super::{Context, ExitCodes};
use crate::secrets::{self, SecretStore};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<u8> {
    match command {
        Command::Push(args) => push::push(ctx, &args),
        Command::Repo { action } => {
            match action {
                RepoCommand::Add(args) => repo::repo_add(ctx, &args)?,
                RepoCommand::List => repo::repo_list(ctx)?,
                RepoCommand::Show { name } => repo::repo_show(ctx, &name)?,
            }
            Ok(ExitCodes::SUCCESS)
        }
        Command::Auth(args) => {
            auth::auth(ctx, &args)?;
            Ok(ExitCodes::SUCCESS)
        }
        Command::Completion { shell } => {
            completion::completion(shell, &mut std::io::stdout())?;
            Ok(ExitCodes::SUCCESS)
        }
    }
}

/// The secret store for this process, chosen by `DESIGNSYNC_SECRET_STORE`.
pub(crate) fn secret_store() -> Arc<dyn SecretStore> {
    let provider = std::env::var(secrets::SECRET_STORE_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| secrets::DEFAULT_PROVIDER.to_string());
    Arc::from(secrets::create_store_or_fallback(provider.trim()))
}
