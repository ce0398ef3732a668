//! cli::commands::repo
//!
//! Register, list and show repositories in the config store.
//!
//! # Example
//!
//! ```bash
//! dsync repo add brackets --url https://github.com/acme/brackets.git \
//!     --path ~/cad/brackets --formats step,stl --clone
//! dsync repo list
//! dsync repo show brackets
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::auth::redact_userinfo;
use crate::cli::args::RepoAddArgs;
use crate::cli::Context;
use crate::core::config::{expand_home, RepositoryConfig};
use crate::git::{clone_repository, resolve_git_program, SystemProcessRunner, GIT_PROGRAM_ENV};
use crate::ui::output;

/// Register a repository, or update an existing entry in place.
///
/// Keys of an existing entry that the arguments do not cover are kept.
pub fn repo_add(ctx: &Context, args: &RepoAddArgs) -> Result<()> {
    let mut store = ctx.load_store()?;
    let local_path = absolute(&expand_home(&args.path))?;

    let mut repo = match store.get(&args.name) {
        Ok(mut existing) => {
            existing.remote_url = args.url.clone();
            existing.local_path = local_path.clone();
            existing
        }
        Err(_) => RepositoryConfig::new(args.name.clone(), args.url.clone(), local_path.clone()),
    };
    if !args.formats.is_empty() {
        repo.export_formats = args.formats.clone();
    }
    if let Some(template) = &args.branch_template {
        repo.branch_template = template.clone();
    }
    if let Some(template) = &args.commit_template {
        repo.commit_template = template.clone();
    }
    if let Some(subfolder) = &args.subfolder {
        repo.export_subfolder = subfolder.clone();
    }
    if args.use_stored_credential {
        repo.use_stored_credential = true;
    }
    repo.dedup_formats();
    repo.validate()?;

    if local_path.exists() {
        if !local_path.join(".git").exists() {
            bail!(
                "'{}' exists but is not a git working tree",
                local_path.display()
            );
        }
    } else if args.clone {
        clone(ctx, &repo)?;
    } else {
        output::warn(
            format!(
                "'{}' does not exist yet; run again with --clone to clone it",
                local_path.display()
            ),
            ctx.verbosity,
        );
    }

    store.upsert(&repo)?;
    store.save()?;
    output::print(
        format!("Registered '{}' in {}", repo.name, store.path().display()),
        ctx.verbosity,
    );
    Ok(())
}

/// List registered repositories; the last used one is marked with `*`.
pub fn repo_list(ctx: &Context) -> Result<()> {
    let store = ctx.load_store()?;
    let names = store.names();
    if names.is_empty() {
        output::print("No repositories registered.", ctx.verbosity);
        return Ok(());
    }
    let last = store.meta().ok().and_then(|m| m.last_selected_repo);

    for name in names {
        let marker = if last.as_deref() == Some(name.as_str()) { "*" } else { " " };
        match store.get(&name) {
            Ok(repo) => println!(
                "{marker} {name}\t{}\t{}",
                redact_userinfo(&repo.remote_url),
                repo.local_path.display()
            ),
            Err(e) => println!("{marker} {name}\t(invalid: {e})"),
        }
    }
    Ok(())
}

/// Print one repository's settings as JSON.
pub fn repo_show(ctx: &Context, name: &str) -> Result<()> {
    let store = ctx.load_store()?;
    let mut repo = store.get(name)?;
    repo.remote_url = redact_userinfo(&repo.remote_url);
    let json = serde_json::to_string_pretty(&repo).context("failed to render settings")?;
    println!("{name}:");
    println!("{json}");
    Ok(())
}

fn clone(ctx: &Context, repo: &RepositoryConfig) -> Result<()> {
    let program = resolve_git_program(std::env::var_os(GIT_PROGRAM_ENV));
    output::print(
        format!(
            "Cloning {} into {}",
            redact_userinfo(&repo.remote_url),
            repo.local_path.display()
        ),
        ctx.verbosity,
    );
    let out = clone_repository(
        &SystemProcessRunner,
        &program,
        &repo.remote_url,
        &repo.local_path,
        &[],
        ctx.timeouts.network,
    )?;
    if !out.ok {
        bail!("clone failed: {}", out.message());
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    Ok(cwd.join(path))
}
