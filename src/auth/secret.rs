//! auth::secret
//!
//! A string that never prints.

use std::fmt;

/// An opaque secret value (a personal access token).
///
/// `Debug` and `Display` both render `<redacted>`; the only way to reach
/// the value is [`Secret::expose`], which makes every use greppable.
///
/// # Example
///
/// ```
/// use designsync::auth::Secret;
///
/// let token = Secret::new("ghp_example");
/// assert_eq!(format!("{token}"), "<redacted>");
/// assert_eq!(format!("{token:?}"), "Secret(<redacted>)");
/// assert_eq!(token.expose(), "ghp_example");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}
