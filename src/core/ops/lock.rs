//! core::ops::lock
//!
//! One publish run per working tree. Two overlapping runs would each
//! autostash, and the second restore could pop the first run's stash.
//!
//! The lock is an `fs2` exclusive lock on `<git_dir>/designsync.lock`,
//! so it never shows up in `git status`. The holder writes its pid into
//! the file; a refused run reads it back for the error message. Taking
//! the lock never blocks.
//!
//! ```no_run
//! use designsync::core::ops::lock::RunLock;
//! use designsync::core::paths::RepoPaths;
//! use std::path::Path;
//!
//! let paths = RepoPaths::discover(Path::new("/repo")).unwrap();
//! let _guard = RunLock::acquire(&paths).unwrap();
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::RepoPaths;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("{} is locked by another designsync run{}", .path.display(), holder_suffix(.holder))]
    Busy { path: PathBuf, holder: Option<u32> },

    #[error("cannot lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn holder_suffix(holder: &Option<u32>) -> String {
    holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default()
}

/// Guard for a running publish. Dropping it unlocks.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: Option<File>,
}

impl RunLock {
    pub fn acquire(paths: &RepoPaths) -> Result<Self, LockError> {
        let path = paths.lock_path();
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() != io::ErrorKind::WouldBlock {
                return Err(io_err(e));
            }
            return Err(LockError::Busy {
                holder: read_holder(&mut file),
                path,
            });
        }

        // Stale pid text from an earlier run is harmless; overwrite it.
        let stamp = format!("{}\n", std::process::id());
        file.set_len(0)
            .and_then(|()| file.write_all(stamp.as_bytes()))
            .map_err(io_err)?;

        tracing::debug!(path = %path.display(), "took run lock");
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Unlock now. Later calls do nothing.
    pub fn release(&mut self) -> Result<(), LockError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        file.unlock().map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "released run lock");
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

fn read_holder(file: &mut File) -> Option<u32> {
    let mut text = String::new();
    file.rewind().ok()?;
    file.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}
