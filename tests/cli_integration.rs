//! Integration tests for the `dsync` binary.
//!
//! These run the built binary with an isolated config file and the
//! in-memory secret store, and check exit codes and output.

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `dsync` command isolated from the user's config and keychain.
fn dsync(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dsync").unwrap();
    cmd.env("DESIGNSYNC_CONFIG", config)
        .env("DESIGNSYNC_SECRET_STORE", "memory")
        .env_remove("DESIGNSYNC_TOKEN")
        .env_remove("DESIGNSYNC_USERNAME")
        .env_remove("RUST_LOG")
        .arg("--no-interactive");
    cmd
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A working tree with a bare remote; returns (tempdir, work, remote).
fn fixture() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let work = dir.path().join("work");
    let remote = dir.path().join("remote.git");
    std::fs::create_dir_all(&work).unwrap();

    run_git(dir.path(), &["init", "--bare", "remote.git"]);
    run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(&work, &["init"]);
    run_git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(&work, &["config", "user.email", "test@example.com"]);
    run_git(&work, &["config", "user.name", "Test User"]);
    run_git(&work, &["config", "commit.gpgsign", "false"]);
    std::fs::write(work.join("README.md"), "# Designs\n").unwrap();
    run_git(&work, &["add", "README.md"]);
    run_git(&work, &["commit", "-m", "Initial commit"]);
    run_git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
    run_git(&work, &["push", "-u", "origin", "main"]);
    (dir, work, remote)
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    dsync(&dir.path().join("repos.json"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn push_without_files_is_usage_error() {
    let dir = TempDir::new().unwrap();
    dsync(&dir.path().join("repos.json"))
        .args(["push", "--repo", "brackets"])
        .assert()
        .code(2);
}

#[test]
fn unknown_repository_fails() {
    let dir = TempDir::new().unwrap();
    dsync(&dir.path().join("repos.json"))
        .args(["push", "--repo", "brackets", "--files", "Bracket.step"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn completion_generates_script() {
    let dir = TempDir::new().unwrap();
    dsync(&dir.path().join("repos.json"))
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dsync"));
}

#[test]
fn repo_add_then_show_and_list() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("repos.json");
    let target = dir.path().join("later");

    dsync(&config)
        .args(["repo", "add", "brackets", "--url", "https://example.com/acme/brackets.git"])
        .arg("--path")
        .arg(&target)
        .args(["--formats", "step,stl"])
        .assert()
        .success();

    dsync(&config)
        .args(["repo", "show", "brackets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"remoteUrl\""))
        .stdout(predicate::str::contains("\"stl\""));

    dsync(&config)
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("brackets"));
}

#[test]
fn auth_status_without_credential() {
    let dir = TempDir::new().unwrap();
    dsync(&dir.path().join("repos.json"))
        .args(["auth", "https://example.com/acme/brackets.git", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No credential stored"));
}

#[test]
fn push_by_path_succeeds() {
    let (dir, work, remote) = fixture();
    let file = dir.path().join("Bracket.step");
    std::fs::write(&file, "solid\n").unwrap();

    dsync(&dir.path().join("repos.json"))
        .args(["push", "--yes", "--branch", "review/bracket"])
        .arg("--path")
        .arg(&work)
        .arg("--files")
        .arg(&file)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Pushed successfully."))
        .stdout(predicate::str::contains("review/bracket"));

    let status = StdCommand::new("git")
        .arg("--git-dir")
        .arg(&remote)
        .args(["rev-parse", "--verify", "--quiet", "refs/heads/review/bracket"])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn push_on_detached_head_exits_one() {
    let (dir, work, _remote) = fixture();
    run_git(&work, &["checkout", "--detach"]);
    let file = dir.path().join("Bracket.step");
    std::fs::write(&file, "solid\n").unwrap();

    dsync(&dir.path().join("repos.json"))
        .args(["push", "--yes"])
        .arg("--path")
        .arg(&work)
        .arg("--files")
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Push failed."))
        .stderr(predicate::str::contains("detached"));
}

#[test]
fn push_leaving_a_stash_behind_exits_three() {
    let (dir, work, _remote) = fixture();
    std::fs::write(work.join("Bracket.step"), "local draft\n").unwrap();
    let file = dir.path().join("Bracket.step");
    std::fs::write(&file, "solid\n").unwrap();

    dsync(&dir.path().join("repos.json"))
        .args(["push", "--yes"])
        .arg("--path")
        .arg(&work)
        .arg("--files")
        .arg(&file)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("manual recovery"));

    let stashes = StdCommand::new("git")
        .args(["stash", "list"])
        .current_dir(&work)
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&stashes.stdout).lines().count(), 1);
}
