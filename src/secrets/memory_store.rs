//! secrets::memory_store
//!
//! A map behind a mutex. Selected with `DESIGNSYNC_SECRET_STORE=memory`
//! and used by hosts that inject a token per run and by the test suites.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{SecretError, SecretStore, StoreAction};

const NAME: &str = "memory";

#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `key`.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }

    fn entries(
        &self,
        action: StoreAction,
        key: &str,
    ) -> Result<MutexGuard<'_, HashMap<String, String>>, SecretError> {
        self.entries
            .lock()
            .map_err(|_| SecretError::backend(NAME, action, key, "lock poisoned"))
    }
}

// Only the entry count; values and keys stay out of debug output.
impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.lock().map(|e| e.len()).unwrap_or_default();
        write!(f, "MemorySecretStore({len} entries)")
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.entries(StoreAction::Read, key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.entries(StoreAction::Write, key)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.entries(StoreAction::Delete, key)?.remove(key);
        Ok(())
    }
}
