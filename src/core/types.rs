//! core::types
//!
//! [`BranchName`] and [`Oid`]: strings that have been checked once, at
//! construction, so later code can hand them to git unquoted.
//!
//! ```
//! use designsync::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("export/Bracket-20240309-140500").unwrap();
//! assert_eq!(branch.as_str(), "export/Bracket-20240309-140500");
//! assert!(BranchName::new("review/..").is_err());
//!
//! let head = Oid::new("9FCEB02D0AE598E95DC970B74767F19372D61AF8\n").unwrap();
//! assert_eq!(head.short(7), "9fceb02");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("'{name}' is not a usable branch name: {reason}")]
    BranchName { name: String, reason: &'static str },

    #[error("'{value}' is not a git object id: {reason}")]
    Oid { value: String, reason: &'static str },
}

/// Characters `git check-ref-format` refuses anywhere in a ref.
const FORBIDDEN_CHARS: &[char] = &[' ', '~', '^', ':', '\\', '?', '*', '['];

/// A local branch name that `git check-ref-format --branch` accepts.
///
/// The sanitizer in [`naming`](crate::core::naming) produces these from
/// user templates; names read back from git or the changelog go through
/// the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match ref_format_violation(&name) {
            Some(reason) => Err(TypeError::BranchName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The first rule `name` breaks, if any.
fn ref_format_violation(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("empty");
    }
    if name == "HEAD" || name == "@" {
        return Some("reserved by git");
    }
    if name.starts_with('-') {
        return Some("starts with '-'");
    }
    if name.ends_with('/') || name.ends_with('.') {
        return Some("ends with '/' or '.'");
    }
    if name.contains("..") || name.contains("@{") {
        return Some("contains '..' or '@{'");
    }
    if name.chars().any(|c| c.is_ascii_control() || FORBIDDEN_CHARS.contains(&c)) {
        return Some("contains a space, control character or one of ~^:\\?*[");
    }
    // Per component: covers `//`, leading dots and `.lock` suffixes.
    name.split('/').find_map(|component| {
        if component.is_empty() {
            Some("has an empty path component")
        } else if component.starts_with('.') {
            Some("has a component starting with '.'")
        } else if component.ends_with(".lock") {
            Some("has a component ending in '.lock'")
        } else {
            None
        }
    })
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full commit or stash id, lowercase hex (SHA-1 or SHA-256 width).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Accepts `git rev-parse` output as is: trailing newline and any case.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let value = oid.into().trim().to_ascii_lowercase();
        let reason = if !matches!(value.len(), 40 | 64) {
            Some("expected 40 or 64 characters")
        } else if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some("not hexadecimal")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TypeError::Oid { value, reason }),
            None => Ok(Self(value)),
        }
    }

    /// The first `len` characters, for logs and summaries.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
