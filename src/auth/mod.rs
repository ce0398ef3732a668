//! auth
//!
//! Push credentials: identity, resolution, and injection into git.
//!
//! # Components
//!
//! - [`Secret`] - token wrapper that never prints
//! - [`RepoIdentity`] - `host/path` key derived from a remote URL
//! - [`CredentialResolver`] - get/set/clear backed by a
//!   [`SecretStore`](crate::secrets::SecretStore), plus push-time resolution
//! - [`AskpassEnv`] - transient `GIT_ASKPASS` environment for one push
//!
//! # Security
//!
//! Tokens MUST never appear in:
//! - logs (including `--debug`)
//! - the repository config file
//! - git config or command-line arguments
//! - error messages
//!
//! Every type here that can hold a token implements `Debug` by hand.

mod askpass;
mod identity;
mod resolver;
mod secret;

pub use askpass::{AskpassEnv, TOKEN_VAR, USERNAME_VAR};
pub use identity::{redact_userinfo, IdentityError, RepoIdentity, Transport};
pub use resolver::{
    Credential, CredentialOverride, CredentialPrompt, CredentialResolver, CredentialSource,
    Resolution, DEFAULT_USERNAME,
};
pub use secret::Secret;
