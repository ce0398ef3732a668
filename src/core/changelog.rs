//! core::changelog
//!
//! The repository changelog: a Markdown document with the newest entry
//! first.
//!
//! # Format
//!
//! ```text
//! # Changelog
//!
//! ## 2024-03-09 14:05:00 - Branch: export/bracket-20240309-140500
//!
//! > Design update: bracket
//!
//! - `exports/bracket.step`
//!
//! ---
//! ```
//!
//! Every commit-message line is quoted with `> ` so message text can never
//! be mistaken for a heading, a file bullet, or the entry separator.
//!
//! # Atomicity
//!
//! [`prepend`] writes the whole new document to a temporary file in the
//! same directory and renames it over the old one. The temporary file is
//! removed if anything fails before the rename, so a crash leaves either
//! the old or the new changelog, never a truncated one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::types::BranchName;

/// Top-level heading of every changelog.
pub const CHANGELOG_HEADER: &str = "# Changelog";

const HEADING_PREFIX: &str = "## ";
const BRANCH_MARKER: &str = " - Branch: ";
const ENTRY_SEPARATOR: &str = "---";
const HEADING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors reading or writing a changelog.
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("failed to read changelog '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write changelog '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed changelog heading on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// One published export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub timestamp: NaiveDateTime,
    pub branch: BranchName,
    pub message: String,
    /// Repo-relative paths, `/`-separated.
    pub files: Vec<String>,
}

impl ChangelogEntry {
    /// Render this entry as a Markdown block, ending with the separator
    /// and a blank line.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{HEADING_PREFIX}{}{BRANCH_MARKER}{}\n\n",
            self.timestamp.format(HEADING_TIME_FORMAT),
            self.branch
        );
        for line in self.message.split('\n') {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
        }
        if !self.files.is_empty() {
            out.push('\n');
            for file in &self.files {
                out.push_str(&format!("- `{file}`\n"));
            }
        }
        out.push('\n');
        out.push_str(ENTRY_SEPARATOR);
        out.push_str("\n\n");
        out
    }
}

/// Prepend `entry` to the changelog at `path`, creating it if needed.
///
/// Existing content below the header is kept byte for byte. A file
/// without the `# Changelog` header gets one, with its old content kept
/// beneath the new entry.
///
/// # Errors
///
/// Returns [`ChangelogError`] if the existing file cannot be read or the
/// new one cannot be written. The original file is untouched on error.
pub fn prepend(path: &Path, entry: &ChangelogEntry) -> Result<(), ChangelogError> {
    let existing = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ChangelogError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let body = strip_header(&existing);
    let mut document = format!("{CHANGELOG_HEADER}\n\n");
    document.push_str(&entry.render());
    document.push_str(body);

    write_atomic(path, &document).map_err(|source| ChangelogError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), branch = %entry.branch, "prepended changelog entry");
    Ok(())
}

/// Read every entry from the changelog at `path`, newest first.
///
/// A missing file yields no entries. Content that is not part of an entry
/// (the header, free text from older tools) is ignored.
///
/// # Errors
///
/// Returns [`ChangelogError::Parse`] if an entry heading cannot be parsed.
pub fn read_entries(path: &Path) -> Result<Vec<ChangelogEntry>, ChangelogError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_entries(&contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ChangelogError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse changelog text into entries, in document order.
pub fn parse_entries(contents: &str) -> Result<Vec<ChangelogEntry>, ChangelogError> {
    let mut entries = Vec::new();
    let mut current: Option<(ChangelogEntry, Vec<String>)> = None;

    for (index, line) in contents.lines().enumerate() {
        if let Some(heading) = line.strip_prefix(HEADING_PREFIX) {
            if let Some(done) = current.take() {
                entries.push(finish(done));
            }
            let (timestamp, branch) = parse_heading(heading).map_err(|message| {
                ChangelogError::Parse {
                    line: index + 1,
                    message,
                }
            })?;
            current = Some((
                ChangelogEntry {
                    timestamp,
                    branch,
                    message: String::new(),
                    files: Vec::new(),
                },
                Vec::new(),
            ));
            continue;
        }

        let Some((entry, message_lines)) = current.as_mut() else {
            continue;
        };
        if line == ">" {
            message_lines.push(String::new());
        } else if let Some(text) = line.strip_prefix("> ") {
            message_lines.push(text.to_string());
        } else if let Some(file) = line
            .strip_prefix("- `")
            .and_then(|rest| rest.strip_suffix('`'))
        {
            entry.files.push(file.to_string());
        }
    }

    if let Some(done) = current.take() {
        entries.push(finish(done));
    }
    Ok(entries)
}

fn finish((mut entry, message_lines): (ChangelogEntry, Vec<String>)) -> ChangelogEntry {
    entry.message = message_lines.join("\n");
    entry
}

fn parse_heading(heading: &str) -> Result<(NaiveDateTime, BranchName), String> {
    let (stamp, branch) = heading
        .split_once(BRANCH_MARKER)
        .ok_or_else(|| format!("missing '{}' in heading", BRANCH_MARKER.trim()))?;
    let timestamp = NaiveDateTime::parse_from_str(stamp.trim(), HEADING_TIME_FORMAT)
        .map_err(|e| format!("bad timestamp '{stamp}': {e}"))?;
    let branch = BranchName::new(branch.trim()).map_err(|e| e.to_string())?;
    Ok((timestamp, branch))
}

fn strip_header(contents: &str) -> &str {
    match contents.strip_prefix(CHANGELOG_HEADER) {
        Some(rest) if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") => {
            rest.trim_start_matches(['\r', '\n'])
        }
        _ => contents,
    }
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Dropped (and deleted) on any early return.
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
