//! cli::commands::push
//!
//! Publish exported files: resolve the repository, build a
//! [`PushRequest`] and hand it to the [`WorkflowEngine`].
//!
//! # Example
//!
//! ```bash
//! dsync push --repo brackets --files out/Bracket.step out/Bracket.stl
//! dsync push --path ./designs --files out/Wing.step --branch review/wing --yes
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};

use super::secret_store;
use crate::auth::{CredentialOverride, CredentialResolver, RepoIdentity, Secret};
use crate::cli::args::PushArgs;
use crate::cli::{Context, ExitCodes};
use crate::core::config::schema::DEFAULT_REMOTE;
use crate::core::config::{RepositoryConfig, RepositoryConfigStore};
use crate::core::paths::RepoPaths;
use crate::engine::{PushRequest, Status, WorkflowContext, WorkflowEngine, WorkflowResult};
use crate::git::{GitClient, SystemProcessRunner};
use crate::ui::output;
use crate::ui::prompts::{self, TerminalCredentialPrompt};

/// Run the push command and return the exit code.
pub fn push(ctx: &Context, args: &PushArgs) -> Result<u8> {
    let mut store = ctx.load_store()?;
    let wctx = WorkflowContext::from_env()
        .with_timeouts(ctx.timeouts)
        .with_interactive(ctx.interactive);

    let (mut repo, registered) = match (&args.repo, &args.path) {
        (Some(name), _) => (
            store
                .get(name)
                .with_context(|| format!("cannot use repository '{name}'"))?,
            true,
        ),
        (None, Some(path)) => (ad_hoc_repository(path, args, &wctx)?, false),
        (None, None) => bail!("either --repo or --path is required"),
    };
    apply_overrides(&mut repo, args);

    let request = build_request(repo.clone(), args)?;

    if !args.yes && ctx.interactive {
        output::print(describe(&request), ctx.verbosity);
        if !prompts::confirm("Proceed?", true, true)? {
            output::print("Aborted.", ctx.verbosity);
            return Ok(ExitCodes::FAILED);
        }
    }

    let credentials = CredentialResolver::new(secret_store())
        .with_prompt(Arc::new(TerminalCredentialPrompt));
    let engine = WorkflowEngine::new(wctx, credentials);
    let result = engine.run(&request);
    output::print_result(&result, ctx.verbosity);

    if result.status != Status::Failed && (registered || args.save) {
        if let Err(e) = remember(&mut store, &repo, &request, args.save) {
            output::warn(format!("could not update {}: {e:#}", store.path().display()), ctx.verbosity);
        }
    }

    Ok(exit_code(&result))
}

/// Map a workflow status to the process exit code.
pub fn exit_code(result: &WorkflowResult) -> u8 {
    match result.status {
        Status::Success => ExitCodes::SUCCESS,
        Status::Failed => ExitCodes::FAILED,
        Status::PartialRecoveryNeeded => ExitCodes::PARTIAL_RECOVERY,
    }
}

/// Settings for a repository given by path instead of by name. The remote
/// URL is read from git.
fn ad_hoc_repository(
    path: &Path,
    args: &PushArgs,
    wctx: &WorkflowContext,
) -> Result<RepositoryConfig> {
    let path = std::fs::canonicalize(path)
        .with_context(|| format!("repository path '{}' does not exist", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("cannot name repository at '{}'", path.display()))?;

    let paths = RepoPaths::discover(&path)?;
    let git = GitClient::new(
        Arc::new(SystemProcessRunner),
        wctx.git_program.clone(),
        paths,
        wctx.timeouts,
    )?;
    let remote = args.remote.as_deref().unwrap_or(DEFAULT_REMOTE);
    let out = git.remote_url(remote)?;
    if !out.ok {
        bail!("no remote '{remote}' in {}: {}", path.display(), out.message());
    }
    let url = out.stdout_trimmed().to_string();

    let mut repo = RepositoryConfig::new(name, url.clone(), path);
    repo.use_stored_credential = RepoIdentity::parse(&url).is_ok_and(|id| id.is_https());
    Ok(repo)
}

fn apply_overrides(repo: &mut RepositoryConfig, args: &PushArgs) {
    if let Some(template) = &args.branch_template {
        repo.branch_template = template.clone();
    }
    if let Some(template) = &args.commit_template {
        repo.commit_template = template.clone();
    }
    if let Some(subfolder) = &args.subfolder {
        repo.export_subfolder = subfolder.clone();
    }
    if let Some(remote) = &args.remote {
        repo.remote = remote.clone();
    }
    if args.no_changelog {
        repo.changelog = false;
    }
}

fn build_request(repo: RepositoryConfig, args: &PushArgs) -> Result<PushRequest> {
    let design_name = match &args.design_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => args
            .files
            .first()
            .and_then(|f| f.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("cannot derive a design name; pass --design-name"))?,
    };

    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let files: Vec<PathBuf> = args.files.iter().map(|f| cwd.join(f)).collect();

    let mut request = PushRequest::new(repo, design_name).with_files(files);
    if let Some(message) = &args.message {
        request = request.with_message(message.clone());
    }
    if let Some(branch) = &args.branch {
        request = request.with_branch_override(branch.clone());
    }
    request.force_push = args.force;
    request.skip_pull |= args.skip_pull;
    request.return_to_original_branch = args.return_to_branch;
    request.credential = CredentialOverride {
        username: args.username.clone(),
        token: args.token.clone().map(Secret::new),
    };
    Ok(request)
}

fn describe(request: &PushRequest) -> String {
    let repo = &request.repository;
    let mut lines = vec![
        format!(
            "Push {} file(s) to {} ({})",
            request.files.len(),
            repo.name,
            crate::auth::redact_userinfo(&repo.remote_url)
        ),
        format!("  path:    {}", repo.local_path.display()),
        format!(
            "  branch:  {}",
            request
                .branch_override
                .as_deref()
                .unwrap_or(repo.branch_template.as_str())
        ),
    ];
    if request.force_push {
        lines.push("  force:   yes (--force-with-lease)".to_string());
    }
    if request.skip_pull {
        lines.push("  pull:    skipped".to_string());
    }
    lines.join("\n")
}

fn remember(
    store: &mut RepositoryConfigStore,
    repo: &RepositoryConfig,
    request: &PushRequest,
    save: bool,
) -> Result<()> {
    if save {
        store.upsert(repo)?;
    }
    let message = Some(request.message.as_str()).filter(|m| !m.trim().is_empty());
    store.remember_last_run(&repo.name, message)?;
    store.save()?;
    tracing::debug!(path = %store.path().display(), "updated repository config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::args::{Cli, Command};

    fn push_args(extra: &[&str]) -> PushArgs {
        let mut argv = vec!["dsync", "push", "--repo", "brackets", "--files", "out/Bracket.step"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Push(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn repo() -> RepositoryConfig {
        RepositoryConfig::new("brackets", "https://example.com/o/r.git", "/tmp/r".into())
    }

    #[test]
    fn overrides_replace_settings() {
        let args = push_args(&[
            "--branch-template",
            "cad/{filename}",
            "--subfolder",
            "parts",
            "--no-changelog",
            "--remote",
            "upstream",
        ]);
        let mut repo = repo();
        apply_overrides(&mut repo, &args);
        assert_eq!(repo.branch_template, "cad/{filename}");
        assert_eq!(repo.export_subfolder, "parts");
        assert_eq!(repo.remote, "upstream");
        assert!(!repo.changelog);
    }

    #[test]
    fn design_name_defaults_to_file_stem() {
        let request = build_request(repo(), &push_args(&[])).unwrap();
        assert_eq!(request.design_name, "Bracket");
        assert!(request.files[0].source.is_absolute());
    }

    #[test]
    fn request_carries_flags_and_token() {
        let args = push_args(&[
            "--force",
            "--skip-pull",
            "--design-name",
            "Wing",
            "--token",
            "s3cret",
            "--branch",
            "review/wing",
        ]);
        let request = build_request(repo(), &args).unwrap();
        assert!(request.force_push);
        assert!(request.skip_pull);
        assert_eq!(request.design_name, "Wing");
        assert_eq!(request.branch_override.as_deref(), Some("review/wing"));
        assert_eq!(request.credential.token.as_ref().unwrap().expose(), "s3cret");
        assert!(!describe(&request).contains("s3cret"));
    }

    #[test]
    fn remember_saves_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RepositoryConfigStore::empty(dir.path().join("repos.json"));
        let request = PushRequest::new(repo(), "Bracket").with_message("first cut");
        remember(&mut store, &repo(), &request, true).unwrap();

        let store = RepositoryConfigStore::load(&dir.path().join("repos.json")).unwrap();
        assert!(store.contains("brackets"));
        let meta = store.meta().unwrap();
        assert_eq!(meta.last_selected_repo.as_deref(), Some("brackets"));
        assert_eq!(meta.last_commit_message.as_deref(), Some("first cut"));
    }

    #[test]
    fn describe_shows_template_without_override() {
        let text = describe(&PushRequest::new(repo(), "Bracket"));
        assert!(text.contains("export/{filename}-{timestamp}"));
    }
}
