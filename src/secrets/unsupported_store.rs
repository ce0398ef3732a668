//! secrets::unsupported_store
//!
//! Prompt-only credentials: used where no OS secret manager exists, or
//! when `DESIGNSYNC_SECRET_STORE=none`. Every push that needs a token
//! gets it from `--token`, `DESIGNSYNC_TOKEN` or the terminal.

use super::traits::{SecretError, SecretStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSecretStore;

impl SecretStore for UnsupportedSecretStore {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, SecretError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), SecretError> {
        Err(SecretError::NotPersistent { store: "none" })
    }

    fn delete(&self, _key: &str) -> Result<(), SecretError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_nothing() {
        let store = UnsupportedSecretStore;
        assert!(matches!(
            store.set("github.com/acme/widgets.token", "t"),
            Err(SecretError::NotPersistent { .. })
        ));
        assert_eq!(store.get("github.com/acme/widgets.token").unwrap(), None);
        store.delete("github.com/acme/widgets.token").unwrap();
    }
}
