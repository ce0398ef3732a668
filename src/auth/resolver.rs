//! auth::resolver
//!
//! Resolve the credential used for an authenticated push.
//!
//! # Resolution Order
//!
//! 1. Explicit override (`--token` / `DESIGNSYNC_TOKEN`)
//! 2. The secret store, keyed by [`RepoIdentity`]
//! 3. An interactive prompt, when the run is interactive
//! 4. Nothing: the push proceeds and git's own credential helpers apply
//!
//! A store read failure is a warning, not an error; resolution moves on
//! to the next source.

use std::fmt;
use std::sync::Arc;

use super::identity::RepoIdentity;
use super::secret::Secret;
use crate::secrets::{SecretError, SecretStore};

/// Username sent with a token when none is configured. GitHub and Gitea
/// accept any non-empty username alongside a personal access token.
pub const DEFAULT_USERNAME: &str = "x-access-token";

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Override,
    Stored,
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Override => "override",
            CredentialSource::Stored => "secret store",
            CredentialSource::Prompt => "prompt",
        })
    }
}

/// A username and token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub token: Secret,
    pub source: CredentialSource,
}

/// Caller-supplied credential values.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverride {
    pub username: Option<String>,
    pub token: Option<Secret>,
}

/// Asks a human for a credential.
pub trait CredentialPrompt: Send + Sync {
    /// Prompt for a credential for `identity`. `Ok(None)` means the user
    /// declined.
    fn prompt(
        &self,
        identity: &RepoIdentity,
        username_hint: Option<&str>,
    ) -> std::io::Result<Option<(String, Secret)>>;
}

/// A resolved credential (if any) plus warnings gathered on the way.
#[derive(Debug, Default)]
pub struct Resolution {
    pub credential: Option<Credential>,
    pub warnings: Vec<String>,
}

/// Gets, stores and clears push credentials.
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    prompt: Option<Arc<dyn CredentialPrompt>>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.name())
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            prompt: None,
        }
    }

    /// Attach the prompt used for interactive fallback.
    pub fn with_prompt(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Whether the backing store keeps credentials between runs.
    pub fn can_persist(&self) -> bool {
        self.store.is_persistent()
    }

    /// Read the stored credential for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] if the store cannot be read.
    pub fn get(&self, identity: &RepoIdentity) -> Result<Option<Credential>, SecretError> {
        let Some(token) = self.store.get(&identity.token_key())? else {
            return Ok(None);
        };
        let username = self
            .store
            .get(&identity.username_key())?
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        Ok(Some(Credential {
            username,
            token: Secret::new(token),
            source: CredentialSource::Stored,
        }))
    }

    /// Store a credential for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] if the store refuses the write.
    pub fn set(
        &self,
        identity: &RepoIdentity,
        username: Option<&str>,
        token: &Secret,
    ) -> Result<(), SecretError> {
        self.store.set(&identity.token_key(), token.expose())?;
        match username.filter(|u| !u.trim().is_empty()) {
            Some(username) => self.store.set(&identity.username_key(), username.trim())?,
            None => self.store.delete(&identity.username_key())?,
        }
        tracing::info!(identity = %identity, store = self.store.name(), "stored credential");
        Ok(())
    }

    /// Remove the stored credential for `identity`.
    pub fn clear(&self, identity: &RepoIdentity) -> Result<(), SecretError> {
        self.store.delete(&identity.token_key())?;
        self.store.delete(&identity.username_key())?;
        tracing::info!(identity = %identity, store = self.store.name(), "cleared credential");
        Ok(())
    }

    /// Resolve the credential for a push.
    pub fn resolve(
        &self,
        identity: &RepoIdentity,
        overrides: &CredentialOverride,
        interactive: bool,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let username_override = overrides
            .username
            .as_deref()
            .filter(|u| !u.trim().is_empty());

        if let Some(token) = overrides.token.as_ref().filter(|t| !t.is_empty()) {
            resolution.credential = Some(Credential {
                username: username_override.unwrap_or(DEFAULT_USERNAME).to_string(),
                token: token.clone(),
                source: CredentialSource::Override,
            });
            return resolution;
        }

        match self.get(identity) {
            Ok(Some(mut credential)) => {
                if let Some(username) = username_override {
                    credential.username = username.to_string();
                }
                resolution.credential = Some(credential);
                return resolution;
            }
            Ok(None) => {}
            Err(e) => resolution
                .warnings
                .push(format!("could not read stored credential for {identity}: {e}")),
        }

        if interactive {
            if let Some(prompt) = &self.prompt {
                match prompt.prompt(identity, username_override) {
                    Ok(Some((username, token))) if !token.is_empty() => {
                        let username = if username.trim().is_empty() {
                            DEFAULT_USERNAME.to_string()
                        } else {
                            username.trim().to_string()
                        };
                        resolution.credential = Some(Credential {
                            username,
                            token,
                            source: CredentialSource::Prompt,
                        });
                        return resolution;
                    }
                    Ok(_) => {}
                    Err(e) => resolution
                        .warnings
                        .push(format!("credential prompt failed: {e}")),
                }
            }
        }

        resolution.warnings.push(format!(
            "no stored credential for {identity}; pushing with git's own credential helpers"
        ));
        resolution
    }
}
