//! core::config
//!
//! The repository config store.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$DESIGNSYNC_CONFIG` if set
//! 2. `~/.designsync/repos.json` (canonical write location)
//!
//! # Loading
//!
//! The document is kept as raw JSON and each repository is decoded only
//! when asked for, so a broken entry fails loudly when selected without
//! preventing work on the others. A missing file is an empty store.
//!
//! # Example
//!
//! ```no_run
//! use designsync::core::config::RepositoryConfigStore;
//!
//! let path = RepositoryConfigStore::default_path().unwrap();
//! let store = RepositoryConfigStore::load(&path).unwrap();
//! for name in store.names() {
//!     let repo = store.get(&name).unwrap();
//!     println!("{name}: {}", repo.remote_url);
//! }
//! ```

pub mod schema;

pub use schema::{normalize_export_subfolder, Meta, RepositoryConfig, META_KEY, SCHEMA_VERSION};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "DESIGNSYNC_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("repository '{0}' is not configured")]
    UnknownRepository(String),

    #[error("repository '{name}' has an invalid entry: {message}")]
    InvalidRepository { name: String, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loads and saves [`RepositoryConfig`] entries.
#[derive(Debug, Clone)]
pub struct RepositoryConfigStore {
    path: PathBuf,
    document: Map<String, Value>,
}

impl RepositoryConfigStore {
    /// Resolve the config file location.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHomeDir` when neither the environment
    /// override nor a home directory is available.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".designsync").join("repos.json"))
    }

    /// Load the store at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or is not a
    /// JSON object.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, starting empty");
                return Ok(Self::empty(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::empty(path.to_path_buf()));
        }

        let value: Value = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let Value::Object(document) = value else {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                message: "top level must be a JSON object".into(),
            });
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// An empty store that will be written to `path` on save.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            document: Map::new(),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all configured repositories, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .document
            .keys()
            .filter(|key| key.as_str() != META_KEY)
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Whether `name` is configured.
    pub fn contains(&self, name: &str) -> bool {
        name != META_KEY && self.document.contains_key(name)
    }

    /// Decode and validate one repository.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownRepository` if `name` is absent
    /// - `ConfigError::InvalidRepository` if a required key is missing or
    ///   has the wrong type
    /// - `ConfigError::InvalidValue` if a value fails validation
    pub fn get(&self, name: &str) -> Result<RepositoryConfig, ConfigError> {
        let value = self
            .document
            .get(name)
            .filter(|_| name != META_KEY)
            .ok_or_else(|| ConfigError::UnknownRepository(name.to_string()))?;

        let mut config: RepositoryConfig =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidRepository {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        config.name = name.to_string();
        config.local_path = expand_home(&config.local_path);
        config.dedup_formats();
        config.validate()?;
        Ok(config)
    }

    /// Insert or replace a repository entry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a blank or reserved name or
    /// a config that fails validation.
    pub fn upsert(&mut self, config: &RepositoryConfig) -> Result<(), ConfigError> {
        let name = config.name.trim();
        if name.is_empty() || name == META_KEY {
            return Err(ConfigError::InvalidValue(format!(
                "'{}' cannot be used as a repository name",
                config.name
            )));
        }
        config.validate()?;

        let value =
            serde_json::to_value(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        self.document.insert(name.to_string(), value);
        Ok(())
    }

    /// Decode the meta block. A missing block yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the block has the wrong shape.
    pub fn meta(&self) -> Result<Meta, ConfigError> {
        match self.document.get(META_KEY) {
            None => Ok(Meta::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| ConfigError::ParseError {
                    path: self.path.clone(),
                    message: format!("{META_KEY}: {e}"),
                })
            }
        }
    }

    /// Replace the meta block, stamping the current schema version.
    pub fn set_meta(&mut self, meta: &Meta) -> Result<(), ConfigError> {
        let mut meta = meta.clone();
        meta.schema_version = SCHEMA_VERSION;
        let value =
            serde_json::to_value(&meta).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        self.document.insert(META_KEY.to_string(), value);
        Ok(())
    }

    /// Record the repository and message of the last run.
    pub fn remember_last_run(
        &mut self,
        repo: &str,
        commit_message: Option<&str>,
    ) -> Result<(), ConfigError> {
        let mut meta = self.meta()?;
        meta.last_selected_repo = Some(repo.to_string());
        if let Some(message) = commit_message {
            meta.last_commit_message = Some(message.to_string());
        }
        self.set_meta(&meta)
    }

    /// Write the store atomically.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn save(&self) -> Result<(), ConfigError> {
        write_config_atomic(&self.path, &Value::Object(self.document.clone()))
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn write_config_atomic(path: &Path, document: &Value) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let mut contents = serde_json::to_string_pretty(document)
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
    contents.push('\n');

    // Write to temp file in same directory (for atomic rename)
    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), "saved repository config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(json: &str) -> (TempDir, RepositoryConfigStore) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repos.json");
        fs::write(&path, json).unwrap();
        let store = RepositoryConfigStore::load(&path).unwrap();
        (temp, store)
    }

    #[test]
    fn missing_file_is_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = RepositoryConfigStore::load(&temp.path().join("nope.json")).unwrap();
        assert!(store.names().is_empty());
        assert_eq!(store.meta().unwrap(), Meta::default());
    }

    #[test]
    fn names_exclude_meta() {
        let (_temp, store) = store_with(
            r#"{"__meta__": {"lastSelectedRepo": "b"},
                "b": {"remoteUrl": "u", "localPath": "/tmp/b"},
                "a": {"remoteUrl": "u", "localPath": "/tmp/a"}}"#,
        );
        assert_eq!(store.names(), ["a", "b"]);
        assert!(!store.contains(META_KEY));
        assert!(matches!(
            store.get(META_KEY),
            Err(ConfigError::UnknownRepository(_))
        ));
    }

    #[test]
    fn broken_entry_only_fails_when_selected() {
        let (_temp, store) = store_with(
            r#"{"good": {"remoteUrl": "u", "localPath": "/tmp/good"},
                "bad": {"localPath": "/tmp/bad"}}"#,
        );
        assert!(store.get("good").is_ok());
        let err = store.get("bad").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository { .. }));
        assert!(err.to_string().contains("remoteUrl"));
    }

    #[test]
    fn get_sets_name() {
        let (_temp, store) = store_with(r#"{"widgets": {"remoteUrl": "u", "localPath": "/tmp/w"}}"#);
        assert_eq!(store.get("widgets").unwrap().name, "widgets");
    }

    #[test]
    fn unknown_repository() {
        let (_temp, store) = store_with("{}");
        assert!(matches!(
            store.get("missing"),
            Err(ConfigError::UnknownRepository(name)) if name == "missing"
        ));
    }

    #[test]
    fn non_object_document_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repos.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            RepositoryConfigStore::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn save_roundtrip_preserves_unknown_top_level_and_meta_keys() {
        let (temp, mut store) = store_with(
            r#"{"__meta__": {"globalLogLevel": "DEBUG"},
                "widgets": {"url": "u", "path": "/tmp/w", "custom": 1}}"#,
        );
        let mut repo = store.get("widgets").unwrap();
        repo.use_stored_credential = true;
        store.upsert(&repo).unwrap();
        store.remember_last_run("widgets", Some("msg")).unwrap();
        store.save().unwrap();

        let reloaded = RepositoryConfigStore::load(&temp.path().join("repos.json")).unwrap();
        let meta = reloaded.meta().unwrap();
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.last_selected_repo.as_deref(), Some("widgets"));
        assert_eq!(meta.last_commit_message.as_deref(), Some("msg"));
        assert_eq!(meta.extra["globalLogLevel"], "DEBUG");

        let repo = reloaded.get("widgets").unwrap();
        assert!(repo.use_stored_credential);
        assert_eq!(repo.extra["custom"], 1);

        let raw = fs::read_to_string(temp.path().join("repos.json")).unwrap();
        assert!(!raw.contains("\"url\""));
        assert!(!temp.path().join("repos.json.tmp").exists());
    }

    #[test]
    fn upsert_rejects_reserved_name() {
        let temp = TempDir::new().unwrap();
        let mut store = RepositoryConfigStore::empty(temp.path().join("repos.json"));
        let repo = RepositoryConfig::new(META_KEY, "u", temp.path().to_path_buf());
        assert!(store.upsert(&repo).is_err());
    }

    #[test]
    fn save_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/repos.json");
        let mut store = RepositoryConfigStore::empty(path.clone());
        store
            .upsert(&RepositoryConfig::new("r", "u", temp.path().to_path_buf()))
            .unwrap();
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn expand_home_only_touches_tilde() {
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/repos")), home.join("repos"));
        }
    }
}
