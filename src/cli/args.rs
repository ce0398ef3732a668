//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output; implies `--no-interactive`
//! - `--no-interactive`: Never prompt
//! - `--config <file>`: Repository config file (`DESIGNSYNC_CONFIG`)
//! - `--timeout` / `--network-timeout`: Per-command git timeouts

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// dsync - publish exported design files to a git branch
#[derive(Parser, Debug)]
#[command(name = "dsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    /// Repository config file [default: ~/.designsync/repos.json]
    #[arg(long, global = true, env = "DESIGNSYNC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Timeout for local git commands (e.g. 90s, 2m)
    #[arg(long, global = true, value_parser = humantime::parse_duration, default_value = "120s")]
    pub timeout: Duration,

    /// Timeout for pull, push and clone
    #[arg(long, global = true, value_parser = humantime::parse_duration, default_value = "5m")]
    pub network_timeout: Duration,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true unless `--no-interactive` or `--quiet` was set, or
    /// stdin is not a terminal.
    pub fn interactive(&self) -> bool {
        if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Commit exported files to a new branch and push it
    #[command(
        long_about = "Commit already-exported files to a new branch and push it.\n\n\
            Uncommitted work in the repository is stashed first and restored at the end, \
            whatever happens in between. The branch name comes from the repository's branch \
            template unless --branch is given.",
        after_help = "\
EXAMPLES:
    # Publish two files for a registered repository
    dsync push --repo brackets --files out/Bracket.step out/Bracket.stl

    # Ad hoc repository, explicit branch, no prompts (CI)
    DESIGNSYNC_TOKEN=... dsync push --path ./designs --files out/Wing.step \\
        --branch review/wing --yes --no-interactive

EXIT CODES:
    0  success (pushed, or nothing to commit)
    1  failed; nothing was pushed or the push was refused
    2  invalid arguments
    3  partial recovery needed; uncommitted work is still in the stash"
    )]
    Push(PushArgs),

    /// Manage registered repositories
    Repo {
        #[command(subcommand)]
        action: RepoCommand,
    },

    /// Manage the stored push credential for a repository
    #[command(after_help = "\
EXAMPLES:
    # Store a token (prompts without --token)
    dsync auth brackets

    # Check whether a credential is stored
    dsync auth brackets --status

    # Forget it
    dsync auth brackets --logout")]
    Auth(AuthArgs),

    /// Generate shell completion scripts
    #[command(after_help = "\
INSTALLATION:
    # Bash
    dsync completion bash > ~/.local/share/bash-completion/completions/dsync

    # Zsh
    dsync completion zsh > ~/.zfunc/_dsync

    # Fish
    dsync completion fish > ~/.config/fish/completions/dsync.fish

    # PowerShell
    dsync completion powershell >> $PROFILE")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments of `dsync push`.
#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    /// Registered repository name
    #[arg(long, conflicts_with = "path", required_unless_present = "path")]
    pub repo: Option<String>,

    /// Working tree of an unregistered repository
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Exported files to publish
    #[arg(long, num_args = 1.., required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Name substituted for {filename} [default: stem of the first file]
    #[arg(long)]
    pub design_name: Option<String>,

    /// Commit message; may use {filename}, {timestamp} and {branch}
    #[arg(short, long)]
    pub message: Option<String>,

    /// Branch name, instead of the branch template
    #[arg(long)]
    pub branch: Option<String>,

    /// Override the branch template
    #[arg(long)]
    pub branch_template: Option<String>,

    /// Override the commit template
    #[arg(long)]
    pub commit_template: Option<String>,

    /// Override the export subfolder
    #[arg(long)]
    pub subfolder: Option<String>,

    /// Git remote to pull from and push to
    #[arg(long)]
    pub remote: Option<String>,

    /// Retry a rejected push with --force-with-lease
    #[arg(long)]
    pub force: bool,

    /// Do not pull before branching
    #[arg(long)]
    pub skip_pull: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Do not prepend a changelog entry
    #[arg(long)]
    pub no_changelog: bool,

    /// Check the original branch out again after a successful push
    #[arg(long)]
    pub return_to_branch: bool,

    /// Save the overrides above into the repository config
    #[arg(long)]
    pub save: bool,

    /// Username sent with the token
    #[arg(long, env = "DESIGNSYNC_USERNAME")]
    pub username: Option<String>,

    /// Token for this run; never stored
    #[arg(long, env = "DESIGNSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// `dsync repo` subcommands.
#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Register or update a repository
    Add(RepoAddArgs),

    /// List registered repositories
    List,

    /// Show one repository's settings
    Show {
        /// Repository name
        name: String,
    },
}

/// Arguments of `dsync repo add`.
#[derive(Args, Debug, Clone)]
pub struct RepoAddArgs {
    /// Name used with --repo
    pub name: String,

    /// Remote URL
    #[arg(long)]
    pub url: String,

    /// Absolute path of the working tree
    #[arg(long)]
    pub path: PathBuf,

    /// Export format identifiers, in order (e.g. step,stl)
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    #[arg(long)]
    pub branch_template: Option<String>,

    #[arg(long)]
    pub commit_template: Option<String>,

    #[arg(long)]
    pub subfolder: Option<String>,

    /// Use the stored credential when pushing over HTTPS
    #[arg(long)]
    pub use_stored_credential: bool,

    /// Clone the remote into --path if it does not exist yet
    #[arg(long)]
    pub clone: bool,
}

/// Arguments of `dsync auth`.
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// Registered repository name or remote URL
    pub repo: String,

    /// Token to store (prompted for when omitted)
    #[arg(long, env = "DESIGNSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username to store with the token
    #[arg(long)]
    pub username: Option<String>,

    /// Show whether a credential is stored
    #[arg(long, conflicts_with_all = ["logout", "token"])]
    pub status: bool,

    /// Remove the stored credential
    #[arg(long, conflicts_with = "token")]
    pub logout: bool,
}

/// Shell types for completion generation.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn push_requires_repo_or_path() {
        assert!(Cli::try_parse_from(["dsync", "push", "--files", "a.step"]).is_err());
        assert!(
            Cli::try_parse_from(["dsync", "push", "--repo", "r", "--path", "/p", "--files", "a"])
                .is_err()
        );
    }

    #[test]
    fn push_parses_files_and_timeouts() {
        let cli = Cli::try_parse_from([
            "dsync",
            "--network-timeout",
            "90s",
            "push",
            "--repo",
            "brackets",
            "--files",
            "a.step",
            "b.stl",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.network_timeout, Duration::from_secs(90));
        assert_eq!(cli.timeout, Duration::from_secs(120));
        let Command::Push(args) = cli.command else {
            panic!("expected push");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.force);
        assert_eq!(args.repo.as_deref(), Some("brackets"));
    }

    #[test]
    fn repo_add_splits_formats() {
        let cli = Cli::try_parse_from([
            "dsync", "repo", "add", "brackets", "--url", "https://h/o/r.git", "--path", "/r",
            "--formats", "step,stl",
        ])
        .unwrap();
        let Command::Repo {
            action: RepoCommand::Add(args),
        } = cli.command
        else {
            panic!("expected repo add");
        };
        assert_eq!(args.formats, ["step", "stl"]);
    }
}
