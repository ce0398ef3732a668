//! git::runner
//!
//! External process execution with a timeout.
//!
//! # Architecture
//!
//! [`ProcessRunner`] is the seam between the crate and the operating
//! system. [`SystemProcessRunner`] spawns real processes; tests substitute
//! a scripted runner to exercise paths a local repository cannot provoke
//! (remote rejections, missing upstreams).
//!
//! A non-zero exit is not an error here. The runner reports what happened
//! in a [`ProcessOutput`]; only a failure to start or supervise the
//! process is a [`ProcessError`].
//!
//! # Invariants
//!
//! - stdin is always null, so a child can never block waiting for input
//! - stdout and stderr are drained concurrently, so a chatty child cannot
//!   fill a pipe and stall
//! - on timeout the child is killed and reaped before returning

use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Environment variable overriding the git executable.
pub const GIT_PROGRAM_ENV: &str = "DESIGNSYNC_GIT";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long to wait for pipes after a timeout kill. Grandchildren (ssh,
/// credential helpers) may keep them open past the child's death.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Errors starting or supervising a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// A command to run.
#[derive(Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Extra environment for the child only. Values may be secret.
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Names of the environment overrides, for logging.
    pub fn env_names(&self) -> Vec<&str> {
        self.env.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env", &self.env_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What a finished (or killed) process produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ProcessOutput {
    /// Exit code zero and not timed out.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Runs external commands.
pub trait ProcessRunner: Send + Sync {
    /// Run `spec` to completion or until its timeout expires.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] only when the process cannot be started
    /// or waited on. A non-zero exit is reported in the output.
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();
        let program = spec.program.display().to_string();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in &spec.env {
            command.env(name, value);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (exit_code, timed_out) =
            wait_with_deadline(&mut child, spec.timeout).map_err(|source| ProcessError::Wait {
                program: program.clone(),
                source,
            })?;

        let stdout = collect(stdout, timed_out);
        let mut stderr = collect(stderr, timed_out);
        if timed_out {
            if let Some(timeout) = spec.timeout {
                stderr.push_str(&format!(
                    "\ncommand timed out after {}",
                    humantime::format_duration(timeout)
                ));
            }
        }

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
            timed_out,
            duration: start.elapsed(),
        })
    }
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<(Option<i32>, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait()?;
        return Ok((status.code(), false));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

fn collect(rx: Option<Receiver<Vec<u8>>>, timed_out: bool) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    let bytes = if timed_out {
        rx.recv_timeout(DRAIN_GRACE).ok()
    } else {
        rx.recv().ok()
    };
    bytes
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Resolve the git executable once at startup.
///
/// `override_path` (normally `$DESIGNSYNC_GIT`) wins when non-empty;
/// otherwise `git` is looked up on `PATH`, falling back to the bare name so
/// the spawn error names the missing program.
pub fn resolve_git_program(override_path: Option<OsString>) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        tracing::debug!(git = ?path, "using git from {GIT_PROGRAM_ENV}");
        return PathBuf::from(path);
    }
    match which::which("git") {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(error = %e, "git not found on PATH");
            PathBuf::from("git")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: Vec::new(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    #[test]
    fn debug_hides_env_values() {
        let mut spec = spec("git", &["push"]);
        spec.env.push(("DESIGNSYNC_ASKPASS_TOKEN".into(), "hunter2".into()));
        let rendered = format!("{spec:?}");
        assert!(rendered.contains("DESIGNSYNC_ASKPASS_TOKEN"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let result = SystemProcessRunner.run(&spec("designsync-no-such-program", &[]));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[test]
    fn override_wins() {
        let path = resolve_git_program(Some(OsString::from("/opt/git/bin/git")));
        assert_eq!(path, PathBuf::from("/opt/git/bin/git"));
    }

    #[test]
    fn empty_override_ignored() {
        let path = resolve_git_program(Some(OsString::new()));
        assert_ne!(path, PathBuf::new());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[test]
        fn captures_output_and_exit_code() {
            let out = SystemProcessRunner
                .run(&spec("sh", &["-c", "echo out; echo err >&2; exit 3"]))
                .unwrap();
            assert_eq!(out.exit_code, Some(3));
            assert_eq!(out.stdout.trim(), "out");
            assert_eq!(out.stderr.trim(), "err");
            assert!(!out.success());
        }

        #[test]
        fn passes_env_to_child() {
            let mut spec = spec("sh", &["-c", "printf %s \"$DS_TEST_VALUE\""]);
            spec.env.push(("DS_TEST_VALUE".into(), "hello".into()));
            let out = SystemProcessRunner.run(&spec).unwrap();
            assert!(out.success());
            assert_eq!(out.stdout, "hello");
        }

        #[test]
        fn kills_on_timeout() {
            let mut spec = spec("sh", &["-c", "sleep 5; true"]);
            spec.timeout = Some(Duration::from_millis(200));
            let out = SystemProcessRunner.run(&spec).unwrap();
            assert!(out.timed_out);
            assert_eq!(out.exit_code, None);
            assert!(out.stderr.contains("timed out"));
            assert!(out.duration < Duration::from_secs(5));
        }

        #[test]
        fn large_output_does_not_stall() {
            let out = SystemProcessRunner
                .run(&spec("sh", &["-c", "head -c 1000000 /dev/zero | tr '\\0' a"]))
                .unwrap();
            assert!(out.success());
            assert_eq!(out.stdout.len(), 1_000_000);
        }
    }
}
