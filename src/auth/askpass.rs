//! auth::askpass
//!
//! Transient `GIT_ASKPASS` injection.
//!
//! # Design
//!
//! The askpass script written to disk contains no secret. It echoes one of
//! two environment variables depending on git's prompt, and those
//! variables are set only on the git child process. The script lives in a
//! private temporary directory that is removed when [`AskpassEnv`] drops.
//!
//! Configured credential helpers are switched off for the same child via
//! `GIT_CONFIG_COUNT`, so a stale helper entry cannot shadow the resolved
//! token. Nothing is written to any git config file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::resolver::Credential;

/// Variable the script echoes for username prompts.
pub const USERNAME_VAR: &str = "DESIGNSYNC_ASKPASS_USERNAME";

/// Variable the script echoes for password prompts.
pub const TOKEN_VAR: &str = "DESIGNSYNC_ASKPASS_TOKEN";

#[cfg(unix)]
const SCRIPT_NAME: &str = "askpass.sh";
#[cfg(unix)]
const SCRIPT: &str = "#!/bin/sh\n\
case \"$1\" in\n\
  *[Uu]sername*) printf '%s\\n' \"$DESIGNSYNC_ASKPASS_USERNAME\" ;;\n\
  *) printf '%s\\n' \"$DESIGNSYNC_ASKPASS_TOKEN\" ;;\n\
esac\n";

#[cfg(windows)]
const SCRIPT_NAME: &str = "askpass.bat";
#[cfg(windows)]
const SCRIPT: &str = "@echo off\r\n\
echo %* | findstr /I \"Username\" >nul\r\n\
if %errorlevel%==0 (echo %DESIGNSYNC_ASKPASS_USERNAME%) else (echo %DESIGNSYNC_ASKPASS_TOKEN%)\r\n";

/// A live askpass script plus the environment that activates it.
pub struct AskpassEnv {
    dir: TempDir,
    script: PathBuf,
    env: Vec<(String, String)>,
}

impl std::fmt::Debug for AskpassEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskpassEnv")
            .field("script", &self.script)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl AskpassEnv {
    /// Write the script and build the environment for `credential`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary script cannot be written.
    pub fn new(credential: &Credential) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("designsync-askpass-").tempdir()?;
        let script = dir.path().join(SCRIPT_NAME);
        fs::write(&script, SCRIPT)?;
        make_private_executable(&script)?;

        let env = vec![
            ("GIT_ASKPASS".to_string(), script.display().to_string()),
            ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
            ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
            ("GIT_CONFIG_KEY_0".to_string(), "credential.helper".to_string()),
            ("GIT_CONFIG_VALUE_0".to_string(), String::new()),
            (USERNAME_VAR.to_string(), credential.username.clone()),
            (TOKEN_VAR.to_string(), credential.token.expose().to_string()),
        ];

        tracing::debug!(script = %script.display(), "prepared askpass helper");
        Ok(Self { dir, script, env })
    }

    /// Environment overrides for the git child.
    pub fn env(&self) -> Vec<(String, String)> {
        self.env.clone()
    }

    /// Path of the generated script.
    pub fn script_path(&self) -> &Path {
        &self.script
    }

    /// Directory removed on drop.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(unix)]
fn make_private_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn make_private_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
