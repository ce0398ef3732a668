//! secrets
//!
//! Where push tokens live between runs. The backend is chosen once per
//! process from `DESIGNSYNC_SECRET_STORE` (default `keychain` when the
//! feature is built in); everything downstream sees a `dyn SecretStore`.
//!
//! Tokens never reach the JSON config, log lines or error messages.
//!
//! ```
//! use designsync::secrets::create_store;
//!
//! let store = create_store("none").unwrap();
//! assert!(store.get("github.com/acme/widgets.token").unwrap().is_none());
//! ```

mod keychain_store;
mod memory_store;
mod traits;
mod unsupported_store;

pub use keychain_store::{KeychainSecretStore, KEYCHAIN_SERVICE};
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore, StoreAction};
pub use unsupported_store::UnsupportedSecretStore;

pub const SECRET_STORE_ENV: &str = "DESIGNSYNC_SECRET_STORE";

#[cfg(feature = "keychain")]
pub const DEFAULT_PROVIDER: &str = "keychain";

#[cfg(not(feature = "keychain"))]
pub const DEFAULT_PROVIDER: &str = "none";

const PROVIDERS: &[&str] = &["keychain", "none", "memory"];

/// Build the backend named `provider` (`keychain`, `none` or `memory`).
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    let store: Box<dyn SecretStore> = match provider.trim().to_ascii_lowercase().as_str() {
        "keychain" => Box::new(KeychainSecretStore::new()?),
        "none" => Box::new(UnsupportedSecretStore),
        "memory" => Box::new(MemorySecretStore::new()),
        _ => {
            return Err(SecretError::ProviderNotAvailable(format!(
                "unknown secret store '{provider}' (expected one of: {})",
                PROVIDERS.join(", ")
            )))
        }
    };
    Ok(store)
}

/// [`create_store`], degrading to prompt-only credentials with a warning.
pub fn create_store_or_fallback(provider: &str) -> Box<dyn SecretStore> {
    create_store(provider).unwrap_or_else(|e| {
        tracing::warn!("{e}; credentials will be prompted for");
        Box::new(UnsupportedSecretStore)
    })
}
