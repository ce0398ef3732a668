//! core::paths
//!
//! Centralized path routing for a working tree and its git directory.
//!
//! # Architecture
//!
//! Every location the workflow touches inside a repository is computed
//! here, so the rest of the crate never assumes `.git/` is a directory.
//! A `.git` file (linked worktree or submodule) is followed to the git
//! directory it names.
//!
//! # Storage Layout
//!
//! - `<git_dir>/designsync.lock` - Exclusive run lock
//!
//! # Example
//!
//! ```
//! use designsync::core::paths::RepoPaths;
//! use std::path::PathBuf;
//!
//! let paths = RepoPaths::new(PathBuf::from("/repo"), PathBuf::from("/repo/.git"));
//! assert_eq!(paths.lock_path(), PathBuf::from("/repo/.git/designsync.lock"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors locating a repository on disk.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("repository path does not exist: {0}")]
    Missing(PathBuf),

    #[error("repository path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("no .git directory found at {0}")]
    NoGitDir(PathBuf),

    #[error("unreadable .git file at {path}: {message}")]
    BadGitFile { path: PathBuf, message: String },
}

/// Paths for one working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    /// Root of the working tree.
    pub work_dir: PathBuf,
    /// The git directory (`.git`, or the target of a `.git` file).
    pub git_dir: PathBuf,
}

impl RepoPaths {
    /// Create paths from known locations.
    pub fn new(work_dir: PathBuf, git_dir: PathBuf) -> Self {
        Self { work_dir, git_dir }
    }

    /// Discover the git directory of `work_dir` without running git.
    ///
    /// Only `work_dir` itself is inspected; parents are not searched, since
    /// a configured local path must be the repository root.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when the directory or its `.git` entry is
    /// missing or unreadable.
    pub fn discover(work_dir: &Path) -> Result<Self, PathError> {
        if !work_dir.exists() {
            return Err(PathError::Missing(work_dir.to_path_buf()));
        }
        if !work_dir.is_dir() {
            return Err(PathError::NotADirectory(work_dir.to_path_buf()));
        }

        let dot_git = work_dir.join(".git");
        if dot_git.is_dir() {
            return Ok(Self::new(work_dir.to_path_buf(), dot_git));
        }
        if dot_git.is_file() {
            let git_dir = read_git_file(&dot_git, work_dir)?;
            return Ok(Self::new(work_dir.to_path_buf(), git_dir));
        }

        Err(PathError::NoGitDir(work_dir.to_path_buf()))
    }

    /// Get the path to the run lock file.
    ///
    /// This is `<git_dir>/designsync.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.git_dir.join("designsync.lock")
    }

    /// Resolve a repo-relative path against the working tree.
    pub fn in_work_dir(&self, relative: &Path) -> PathBuf {
        self.work_dir.join(relative)
    }

    /// Check whether a marker file or directory exists in the git dir.
    pub fn git_dir_has(&self, name: &str) -> bool {
        self.git_dir.join(name).exists()
    }
}

fn read_git_file(dot_git: &Path, work_dir: &Path) -> Result<PathBuf, PathError> {
    let contents = fs::read_to_string(dot_git).map_err(|e| PathError::BadGitFile {
        path: dot_git.to_path_buf(),
        message: e.to_string(),
    })?;

    let target = contents
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .ok_or_else(|| PathError::BadGitFile {
            path: dot_git.to_path_buf(),
            message: "missing 'gitdir:' line".into(),
        })?;

    let target = PathBuf::from(target);
    let git_dir = if target.is_absolute() {
        target
    } else {
        work_dir.join(target)
    };

    if !git_dir.is_dir() {
        return Err(PathError::NoGitDir(work_dir.to_path_buf()));
    }
    Ok(git_dir)
}
