//! cli::commands::auth
//!
//! Store, inspect and remove the push credential of a repository.
//!
//! # Design
//!
//! - Tokens are stored via the [`SecretStore`](crate::secrets::SecretStore)
//!   under the repository's identity (`host/owner/repo`)
//! - Tokens are NEVER printed to stdout/stderr
//! - Supports both interactive and non-interactive modes
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for token)
//! dsync auth brackets
//!
//! # Non-interactive
//! DESIGNSYNC_TOKEN=ghp_xxxx dsync auth brackets --username octocat
//!
//! # Check status
//! dsync auth https://github.com/acme/brackets.git --status
//!
//! # Remove stored token
//! dsync auth brackets --logout
//! ```

use anyhow::{bail, Context as _, Result};

use super::secret_store;
use crate::auth::{CredentialResolver, RepoIdentity, Secret};
use crate::cli::args::AuthArgs;
use crate::cli::Context;
use crate::core::config::RepositoryConfigStore;
use crate::ui::output;
use crate::ui::prompts;

/// Run the auth command.
///
/// # Security
///
/// This function NEVER prints the token value. It only confirms success/failure.
pub fn auth(ctx: &Context, args: &AuthArgs) -> Result<()> {
    let store = ctx.load_store()?;
    let identity = identity_for(&store, &args.repo)?;
    let resolver = CredentialResolver::new(secret_store());

    if args.status {
        return show_status(ctx, &resolver, &identity);
    }
    if args.logout {
        resolver
            .clear(&identity)
            .with_context(|| format!("failed to remove credential for {identity}"))?;
        output::print(format!("Removed stored credential for {identity}."), ctx.verbosity);
        return Ok(());
    }

    if !resolver.can_persist() {
        bail!(
            "the '{}' secret store cannot keep credentials; pass --token to `dsync push` instead",
            resolver.store_name()
        );
    }
    if !identity.is_https() {
        output::warn(
            format!("{identity} is not an HTTPS remote; the stored token will not be used"),
            ctx.verbosity,
        );
    }

    let token = match args.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Secret::new(token),
        None if ctx.interactive => prompts::password("Personal access token", true)?,
        None => bail!("no token given; pass --token or set DESIGNSYNC_TOKEN"),
    };
    if token.is_empty() {
        bail!("empty token, nothing stored");
    }

    let username = match &args.username {
        Some(username) => Some(username.clone()),
        None if ctx.interactive => {
            Some(prompts::input("Username", Some(crate::auth::DEFAULT_USERNAME), true)?)
        }
        None => None,
    };

    resolver
        .set(&identity, username.as_deref(), &token)
        .with_context(|| format!("failed to store credential for {identity}"))?;
    output::print(
        format!("Stored credential for {identity} in {}.", resolver.store_name()),
        ctx.verbosity,
    );
    Ok(())
}

/// Identity of a registered repository name, or of a remote URL.
fn identity_for(store: &RepositoryConfigStore, repo: &str) -> Result<RepoIdentity> {
    let url = if store.contains(repo) {
        store.get(repo)?.remote_url
    } else if repo.contains("://") || repo.contains('@') {
        repo.to_string()
    } else {
        bail!("'{repo}' is neither a registered repository nor a remote URL");
    };
    Ok(RepoIdentity::parse(&url)?)
}

fn show_status(ctx: &Context, resolver: &CredentialResolver, identity: &RepoIdentity) -> Result<()> {
    match resolver.get(identity) {
        Ok(Some(credential)) => output::print(
            format!(
                "Credential stored for {identity} (user {}, store {}).",
                credential.username,
                resolver.store_name()
            ),
            ctx.verbosity,
        ),
        Ok(None) => output::print(
            format!("No credential stored for {identity}."),
            ctx.verbosity,
        ),
        Err(e) => bail!("cannot read credential for {identity}: {e}"),
    }
    Ok(())
}
