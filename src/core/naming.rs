//! core::naming
//!
//! Template rendering and branch naming rules.
//!
//! # Placeholders
//!
//! Templates recognize a fixed set of placeholders (see [`Placeholder`]):
//!
//! - `{filename}` - design/artifact name supplied by the caller
//! - `{timestamp}` - local time, `YYYYMMDD-HHMMSS`
//! - `{branch}` - resolved branch name (commit templates only)
//!
//! Anything else in braces is left untouched; an unknown placeholder never
//! causes a failure.
//!
//! # Sanitization
//!
//! [`sanitize_branch_name`] maps arbitrary text onto a ref name matching
//! `^[A-Za-z0-9][A-Za-z0-9._/-]*[A-Za-z0-9]$`, or rejects it when fewer
//! than two usable characters remain.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::core::types::BranchName;

/// Branch template used when a repository does not configure one.
pub const DEFAULT_BRANCH_TEMPLATE: &str = "export/{filename}-{timestamp}";

/// Commit message template used when a repository does not configure one.
pub const DEFAULT_COMMIT_TEMPLATE: &str = "Design update: {filename}";

/// `chrono` format of the `{timestamp}` placeholder: sortable, second
/// precision, no spaces.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Longest branch name we will produce.
pub const MAX_BRANCH_LEN: usize = 200;

/// Errors from branch name resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    /// Nothing valid remained after sanitization.
    #[error("branch name '{raw}' is empty after sanitization")]
    Empty { raw: String },

    /// The sanitized name is reserved by git.
    #[error("branch name '{name}' is reserved")]
    Reserved { name: String },

    /// A single character survived; branch names need at least two.
    #[error("branch name '{name}' (from '{raw}') is too short")]
    TooShort { raw: String, name: String },
}

/// A recognized template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Filename,
    Timestamp,
    Branch,
}

impl Placeholder {
    /// Every recognized placeholder.
    pub const ALL: [Placeholder; 3] = [
        Placeholder::Filename,
        Placeholder::Timestamp,
        Placeholder::Branch,
    ];

    /// The name between the braces.
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Filename => "filename",
            Placeholder::Timestamp => "timestamp",
            Placeholder::Branch => "branch",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Values substituted into templates.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    /// Design or artifact name.
    pub filename: String,
    /// Moment the run started.
    pub timestamp: NaiveDateTime,
    /// Resolved branch, once known.
    pub branch: Option<String>,
}

impl TemplateContext {
    /// Create a context without a branch.
    pub fn new(filename: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            filename: filename.into(),
            timestamp,
            branch: None,
        }
    }

    /// Return a copy with the resolved branch filled in.
    pub fn with_branch(&self, branch: &BranchName) -> Self {
        Self {
            branch: Some(branch.as_str().to_string()),
            ..self.clone()
        }
    }

    /// The `{timestamp}` rendering.
    pub fn timestamp_token(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    fn value(&self, placeholder: Placeholder) -> Option<String> {
        match placeholder {
            Placeholder::Filename => Some(self.filename.clone()),
            Placeholder::Timestamp => Some(self.timestamp_token()),
            Placeholder::Branch => self.branch.clone(),
        }
    }
}

/// Render a template, substituting recognized placeholders.
///
/// Substituted values are never re-scanned, so a file name containing
/// `{timestamp}` stays literal.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use designsync::core::naming::{render, TemplateContext};
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 0).unwrap();
/// let ctx = TemplateContext::new("bracket", ts);
/// assert_eq!(render("{filename}-{timestamp}", &ctx), "bracket-20240309-140500");
/// assert_eq!(render("{filename} {unknown}", &ctx), "bracket {unknown}");
/// ```
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let value = Placeholder::from_name(&after[..close]).and_then(|p| ctx.value(p))?;
            Some((value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '/' | '-')
}

/// Sanitize arbitrary text into a valid branch name.
///
/// - characters outside `[A-Za-z0-9._/-]` become `-`
/// - runs of separators collapse to one (`/` wins if present)
/// - every path component loses leading/trailing separators and any
///   trailing `.lock`; empty components are dropped
/// - the result is capped at [`MAX_BRANCH_LEN`]
///
/// # Errors
///
/// [`NamingError::Empty`] if nothing remains, [`NamingError::TooShort`]
/// for a single character, [`NamingError::Reserved`] for `HEAD`.
///
/// # Example
///
/// ```
/// use designsync::core::naming::sanitize_branch_name;
///
/// assert_eq!(sanitize_branch_name("My Part (v2)").unwrap().as_str(), "My-Part-v2");
/// assert_eq!(sanitize_branch_name("//a..b//").unwrap().as_str(), "a.b");
/// assert!(sanitize_branch_name("???").is_err());
/// ```
pub fn sanitize_branch_name(raw: &str) -> Result<BranchName, NamingError> {
    let mapped: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || is_separator(c) {
                c
            } else {
                '-'
            }
        })
        .take(MAX_BRANCH_LEN)
        .collect();

    let mut collapsed = String::with_capacity(mapped.len());
    let mut run = String::new();
    for c in mapped.chars().chain(std::iter::once('\0')) {
        if is_separator(c) {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            let first = run.chars().next().unwrap_or('-');
            collapsed.push(if run.contains('/') { '/' } else { first });
            run.clear();
        }
        if c != '\0' {
            collapsed.push(c);
        }
    }

    let name = collapsed
        .split('/')
        .map(clean_component)
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if name.is_empty() {
        return Err(NamingError::Empty {
            raw: raw.to_string(),
        });
    }
    if name.len() < 2 {
        return Err(NamingError::TooShort {
            raw: raw.to_string(),
            name,
        });
    }
    if name == "HEAD" {
        return Err(NamingError::Reserved { name });
    }

    BranchName::new(name).map_err(|_| NamingError::Empty {
        raw: raw.to_string(),
    })
}

fn clean_component(component: &str) -> String {
    let mut current = component;
    loop {
        let trimmed = current.trim_matches(|c: char| is_separator(c) && c != '/');
        let stripped = trimmed.strip_suffix(".lock").unwrap_or(trimmed);
        if stripped.len() == current.len() {
            return stripped.to_string();
        }
        current = stripped;
    }
}

/// Resolve the branch for a run.
///
/// A non-blank `override_name` wins and is sanitized; otherwise `template`
/// is rendered against `ctx` and sanitized.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use designsync::core::naming::{resolve_branch_name, TemplateContext};
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 0).unwrap();
/// let ctx = TemplateContext::new("Wing Rib", ts);
///
/// let name = resolve_branch_name("export/{filename}-{timestamp}", None, &ctx).unwrap();
/// assert_eq!(name.as_str(), "export/Wing-Rib-20240309-140500");
///
/// let name = resolve_branch_name("ignored", Some("hotfix/rib"), &ctx).unwrap();
/// assert_eq!(name.as_str(), "hotfix/rib");
/// ```
pub fn resolve_branch_name(
    template: &str,
    override_name: Option<&str>,
    ctx: &TemplateContext,
) -> Result<BranchName, NamingError> {
    match override_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => sanitize_branch_name(name),
        None => {
            let template = if template.trim().is_empty() {
                DEFAULT_BRANCH_TEMPLATE
            } else {
                template
            };
            sanitize_branch_name(&render(template, ctx))
        }
    }
}
