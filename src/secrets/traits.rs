//! secrets::traits
//!
//! The credential store seam. Keys are repository-scoped strings such as
//! `github.com/acme/widgets.token`; values are the raw secrets and are
//! never echoed back through errors, `Debug` output or logs.

use std::fmt::Display;

use thiserror::Error;

/// What a store was doing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Read,
    Write,
    Delete,
}

impl std::fmt::Display for StoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        })
    }
}

/// Failure talking to a credential store.
///
/// `key` names the slot (host and repository path), which is safe to
/// show; the stored value never appears here.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("{store} store could not {action} '{key}': {reason}")]
    Backend {
        store: &'static str,
        action: StoreAction,
        key: String,
        reason: String,
    },

    /// The store is prompt-only and cannot remember anything.
    #[error("the {store} store does not keep credentials; pass --token or enter it when prompted")]
    NotPersistent { store: &'static str },

    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

impl SecretError {
    /// A backend failure for `key`, keeping only the backend's message.
    pub fn backend(
        store: &'static str,
        action: StoreAction,
        key: &str,
        reason: impl Display,
    ) -> Self {
        Self::Backend {
            store,
            action,
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A place to keep push credentials between runs.
pub trait SecretStore: Send + Sync {
    /// Provider name shown by `dsync auth --status`.
    fn name(&self) -> &'static str;

    /// False for stores that forget everything when the process exits;
    /// those force a prompt (or `--token`) on every push.
    fn is_persistent(&self) -> bool {
        true
    }

    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Removing a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_names_slot_not_value() {
        let err = SecretError::backend(
            "keychain",
            StoreAction::Write,
            "github.com/acme/widgets.token",
            "locked",
        );
        let msg = err.to_string();
        assert_eq!(
            msg,
            "keychain store could not write 'github.com/acme/widgets.token': locked"
        );
    }

    #[test]
    fn not_persistent_suggests_token_flag() {
        let err = SecretError::NotPersistent { store: "none" };
        assert!(err.to_string().contains("--token"));
    }
}
