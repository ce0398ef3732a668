//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Document
//!
//! The config file is one JSON object. Every key except [`META_KEY`] names
//! a repository and maps to a [`RepositoryConfig`]:
//!
//! ```json
//! {
//!   "__meta__": { "schemaVersion": 1, "lastSelectedRepo": "widgets" },
//!   "widgets": {
//!     "remoteUrl": "https://github.com/acme/widgets.git",
//!     "localPath": "/home/me/repos/widgets",
//!     "exportFormats": ["step", "stl"],
//!     "branchTemplate": "export/{filename}-{timestamp}",
//!     "commitTemplate": "Design update: {filename}",
//!     "useStoredCredential": true,
//!     "exportSubfolder": "exports/{filename}"
//!   }
//! }
//! ```
//!
//! # Compatibility
//!
//! Older files used `url`, `path`, `branchFormat`, `defaultMessage` and
//! `useStoredPat`; these are accepted as aliases and rewritten under the
//! current names on save. Unknown keys are preserved in both the meta
//! block and each repository.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ConfigError;
use crate::core::naming::{DEFAULT_BRANCH_TEMPLATE, DEFAULT_COMMIT_TEMPLATE};

/// Reserved top-level key holding [`Meta`].
pub const META_KEY: &str = "__meta__";

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Changelog location used when a repository does not configure one.
pub const DEFAULT_CHANGELOG_PATH: &str = "CHANGELOG.md";

/// Remote used when a repository does not configure one.
pub const DEFAULT_REMOTE: &str = "origin";

fn default_branch_template() -> String {
    DEFAULT_BRANCH_TEMPLATE.to_string()
}

fn default_commit_template() -> String {
    DEFAULT_COMMIT_TEMPLATE.to_string()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

fn default_changelog_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHANGELOG_PATH)
}

fn default_true() -> bool {
    true
}

/// Settings for one registered repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// Key of this entry in the document.
    #[serde(skip)]
    pub name: String,

    #[serde(alias = "url")]
    pub remote_url: String,

    #[serde(alias = "path")]
    pub local_path: PathBuf,

    /// Ordered, duplicate-free format identifiers (e.g. `step`, `stl`).
    #[serde(default)]
    pub export_formats: Vec<String>,

    #[serde(default = "default_branch_template", alias = "branchFormat")]
    pub branch_template: String,

    #[serde(default = "default_commit_template", alias = "defaultMessage")]
    pub commit_template: String,

    #[serde(default, alias = "useStoredPat")]
    pub use_stored_credential: bool,

    /// Repo-relative destination folder; may contain placeholders.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub export_subfolder: String,

    /// Per-format export settings, opaque to the workflow.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub format_settings: Map<String, Value>,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Whether pushes prepend a changelog entry.
    #[serde(default = "default_true")]
    pub changelog: bool,

    #[serde(default = "default_changelog_path")]
    pub changelog_path: PathBuf,

    #[serde(default)]
    pub skip_pull_default: bool,

    /// Keys this build does not recognize.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RepositoryConfig {
    /// Create a config with defaults for everything but the required keys.
    pub fn new(name: impl Into<String>, remote_url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            remote_url: remote_url.into(),
            local_path,
            export_formats: Vec::new(),
            branch_template: default_branch_template(),
            commit_template: default_commit_template(),
            use_stored_credential: false,
            export_subfolder: String::new(),
            format_settings: Map::new(),
            remote: default_remote(),
            changelog: true,
            changelog_path: default_changelog_path(),
            skip_pull_default: false,
            extra: Map::new(),
        }
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_url.trim().is_empty() {
            return Err(self.invalid("remoteUrl", "must not be empty"));
        }
        if self.local_path.as_os_str().is_empty() {
            return Err(self.invalid("localPath", "must not be empty"));
        }
        if !self.local_path.is_absolute() {
            return Err(self.invalid(
                "localPath",
                &format!("must be absolute, got '{}'", self.local_path.display()),
            ));
        }
        if self.remote.trim().is_empty() {
            return Err(self.invalid("remote", "must not be empty"));
        }
        let changelog = normalize_relative(&self.changelog_path.to_string_lossy(), "changelog path")
            .map_err(|e| self.invalid("changelogPath", &e.to_string()))?;
        if changelog.is_empty() {
            return Err(self.invalid("changelogPath", "must name a file"));
        }
        normalize_export_subfolder(&self.export_subfolder)
            .map_err(|e| self.invalid("exportSubfolder", &e.to_string()))?;
        Ok(())
    }

    /// Drop duplicate and blank format identifiers, keeping first occurrence.
    pub fn dedup_formats(&mut self) {
        let mut seen = Vec::with_capacity(self.export_formats.len());
        for format in self.export_formats.drain(..) {
            let format = format.trim().to_string();
            if !format.is_empty() && !seen.contains(&format) {
                seen.push(format);
            }
        }
        self.export_formats = seen;
    }

    fn invalid(&self, key: &str, message: &str) -> ConfigError {
        ConfigError::InvalidValue(format!("repository '{}': {key} {message}", self.name))
    }
}

/// Store-wide metadata under [`META_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_selected_repo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_message: Option<String>,

    /// Keys this build does not recognize.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalize an export subfolder to a clean repo-relative path.
///
/// Backslashes become `/`, surrounding whitespace and empty segments are
/// dropped. An empty input yields an empty string (the repository root).
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for absolute paths, `.`/`..`
/// segments, or any of `<>:"|?*`.
///
/// # Example
///
/// ```
/// use designsync::core::config::normalize_export_subfolder;
///
/// assert_eq!(normalize_export_subfolder(" exports\\step// ").unwrap(), "exports/step");
/// assert_eq!(normalize_export_subfolder("").unwrap(), "");
/// assert!(normalize_export_subfolder("../outside").is_err());
/// ```
pub fn normalize_export_subfolder(raw: &str) -> Result<String, ConfigError> {
    normalize_relative(raw, "export subfolder")
}

/// A path that must stay inside the working tree; `what` names it in errors.
fn normalize_relative(raw: &str, what: &str) -> Result<String, ConfigError> {
    let value = raw.trim().replace('\\', "/");
    if value.is_empty() {
        return Ok(String::new());
    }
    if value.starts_with('/') || Path::new(&value).is_absolute() || has_drive_prefix(&value) {
        return Err(ConfigError::InvalidValue(format!(
            "{what} must be relative, got '{raw}'"
        )));
    }

    let mut parts = Vec::new();
    for segment in value.split('/').map(str::trim).filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(ConfigError::InvalidValue(format!(
                "{what} cannot contain '.' or '..' segments"
            )));
        }
        if let Some(c) = segment.chars().find(|c| "<>:\"|?*".contains(*c)) {
            return Err(ConfigError::InvalidValue(format!(
                "invalid character '{c}' in {what} segment '{segment}'"
            )));
        }
        parts.push(segment);
    }
    Ok(parts.join("/"))
}

fn has_drive_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
