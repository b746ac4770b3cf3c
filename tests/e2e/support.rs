//! Fixture helpers: local bare "remote" repositories and producer
//! working copies, built with the real `git` binary so the orchestrator's
//! own fetch/push subprocess calls have something genuine to operate on.

use std::path::Path;
use std::process::Command;

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("git binary must be on PATH for integration tests");
    assert!(
        output.status.success(),
        "git {args:?} in {dir:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a bare repository at `path`, standing in for the registry's
/// remote. Nothing pushes to it until a test does so explicitly.
pub fn init_bare_remote(path: &Path) {
    std::fs::create_dir_all(path).unwrap();
    run_git(path, &["init", "--bare", "-q"]);
}

/// Create a producer's non-bare working copy at `path`, with `origin`
/// pointed at `origin_url` (the producer's own source repository — a
/// different thing from the registry's remote, used only as the
/// ownership identity §3 records) and a committer identity configured.
pub fn init_producer_repo(path: &Path, origin_url: &str) {
    std::fs::create_dir_all(path).unwrap();
    run_git(path, &["init", "-q"]);
    run_git(path, &["config", "user.name", "Producer"]);
    run_git(path, &["config", "user.email", "producer@example.com"]);
    run_git(path, &["remote", "add", "origin", origin_url]);
}

/// Stage and commit everything currently on disk at `path`.
pub fn commit_all(path: &Path, message: &str) {
    run_git(path, &["add", "-A"]);
    run_git(path, &["commit", "-q", "-m", message]);
}
