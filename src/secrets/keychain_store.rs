//! secrets::keychain_store
//!
//! Credentials in the OS secret manager via `keyring`: Keychain on macOS,
//! Credential Manager on Windows, Secret Service on Linux. Each credential
//! is one entry under the [`KEYCHAIN_SERVICE`] service, with the
//! repository key as the account name.
//!
//! Built without the `keychain` feature, [`KeychainSecretStore::new`]
//! reports the provider as unavailable and the caller falls back to
//! prompting.

#[cfg(feature = "keychain")]
use keyring::Entry;

#[cfg(feature = "keychain")]
use super::traits::StoreAction;
use super::traits::{SecretError, SecretStore};

/// Service name every designsync entry is filed under.
pub const KEYCHAIN_SERVICE: &str = "designsync";

const NAME: &str = "keychain";

#[cfg(feature = "keychain")]
#[derive(Debug)]
pub struct KeychainSecretStore {
    service: String,
}

#[cfg(feature = "keychain")]
impl KeychainSecretStore {
    pub fn new() -> Result<Self, SecretError> {
        Ok(Self::with_service(KEYCHAIN_SERVICE))
    }

    /// A store filed under another service name. Tests use this to stay
    /// out of the real entries.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, action: StoreAction, key: &str) -> Result<Entry, SecretError> {
        Entry::new(&self.service, key).map_err(|e| SecretError::backend(NAME, action, key, e))
    }
}

#[cfg(feature = "keychain")]
impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        match self.entry(StoreAction::Read, key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(found)) => Err(SecretError::backend(
                NAME,
                StoreAction::Read,
                key,
                format!("{} matching entries", found.len()),
            )),
            Err(e) => Err(SecretError::backend(NAME, StoreAction::Read, key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.entry(StoreAction::Write, key)?
            .set_password(value)
            .map_err(|e| SecretError::backend(NAME, StoreAction::Write, key, e))
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        match self.entry(StoreAction::Delete, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::backend(NAME, StoreAction::Delete, key, e)),
        }
    }
}

#[cfg(not(feature = "keychain"))]
#[derive(Debug)]
pub struct KeychainSecretStore {
    _private: (),
}

#[cfg(not(feature = "keychain"))]
impl KeychainSecretStore {
    pub fn new() -> Result<Self, SecretError> {
        Err(SecretError::ProviderNotAvailable(
            "keychain support not enabled in this build".into(),
        ))
    }
}

#[cfg(not(feature = "keychain"))]
impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, SecretError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), SecretError> {
        Err(SecretError::NotPersistent { store: NAME })
    }

    fn delete(&self, _key: &str) -> Result<(), SecretError> {
        Ok(())
    }
}

#[cfg(all(test, feature = "keychain"))]
mod tests {
    use super::*;

    #[test]
    fn default_service_name() {
        let store = KeychainSecretStore::new().unwrap();
        assert_eq!(store.service(), KEYCHAIN_SERVICE);
        assert_eq!(store.name(), "keychain");
        assert!(store.is_persistent());
    }

    // Needs a real secret manager; headless CI boxes usually have none.
    #[test]
    #[ignore = "requires a system keychain"]
    fn token_round_trips_through_keychain() {
        let store = KeychainSecretStore::with_service(format!(
            "designsync-test-{}",
            std::process::id()
        ));
        let key = "github.com/acme/widgets.token";

        store.set(key, "ghp_example").unwrap();
        assert_eq!(store.get(key).unwrap().as_deref(), Some("ghp_example"));
        store.delete(key).unwrap();
        assert_eq!(store.get(key).unwrap(), None);
        store.delete(key).unwrap();
    }
}
