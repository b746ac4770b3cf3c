//! Remote operations: fetch with prune, push with a lease.
//!
//! gix does not (yet) support push, so — exactly like the teacher's
//! `operations::push::core` / `operations::auth` — this shells out to the
//! `git` binary for anything that touches the network, with
//! `GIT_TERMINAL_PROMPT=0` so a missing credential fails fast instead of
//! hanging, and `LC_ALL=C`/`LANG=C` so stderr classification is
//! locale-independent.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::error::{GitError, GitResult};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

async fn run_git(work_dir: &Path, args: &[&str], timeout_secs: u64) -> GitResult<Output> {
    let mut cmd = Command::new("git");
    cmd.current_dir(work_dir);
    cmd.args(args);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("LC_ALL", "C");
    cmd.env("LANG", "C");
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(GitError::Io)?;

    let status = tokio::select! {
        result = child.wait() => result.map_err(GitError::Io)?,
        () = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
            let _ = child.kill().await;
            return Err(GitError::NetworkError(format!(
                "git {args:?} timed out after {timeout_secs}s"
            )));
        }
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout).await;
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr).await;
    }

    Ok(Output { status, stdout, stderr })
}

fn classify_failure(output: &Output) -> GitError {
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();

    if is_auth_error(&stderr) {
        return GitError::AuthError(stderr.trim().to_string());
    }
    if is_network_error(&stderr) {
        return GitError::NetworkError(stderr.trim().to_string());
    }
    if stderr.contains("stale info")
        || stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("rejected")
    {
        return GitError::StaleParent {
            expected: String::new(),
            actual: String::new(),
        };
    }

    GitError::GitCommand(stderr.trim().to_string())
}

fn is_auth_error(stderr: &str) -> bool {
    stderr.contains("authentication")
        || stderr.contains("permission denied")
        || stderr.contains("could not read username")
        || stderr.contains("could not read password")
        || stderr.contains("host key verification failed")
        || stderr.contains("repository not found")
}

fn is_network_error(stderr: &str) -> bool {
    stderr.contains("could not resolve host")
        || stderr.contains("connection timed out")
        || stderr.contains("connection refused")
        || stderr.contains("network is unreachable")
        || stderr.contains("could not read from remote repository")
        || stderr.contains("early eof")
}

/// Fetch from `remote` into `work_dir`'s repository, optionally pruning
/// stale remote-tracking refs.
pub async fn fetch(work_dir: &Path, remote: &str, refspec: Option<&str>, prune: bool) -> GitResult<()> {
    let mut args = vec!["fetch"];
    if prune {
        args.push("--prune");
    }
    args.push(remote);
    if let Some(refspec) = refspec {
        args.push(refspec);
    }

    let output = run_git(work_dir, &args, DEFAULT_TIMEOUT_SECS).await?;
    if !output.status.success() {
        return Err(classify_failure(&output));
    }
    Ok(())
}

/// Push `local_ref` to `remote_ref` on `remote`, with a lease asserting
/// the remote ref is still at `lease_target`. Fails with `StaleParent` if
/// the remote has moved (the git equivalent of `--force-with-lease`).
pub async fn push_with_lease(
    work_dir: &Path,
    remote: &str,
    local_ref: &str,
    remote_ref: &str,
    lease_target: &str,
) -> GitResult<()> {
    let refspec = format!("{local_ref}:{remote_ref}");
    let lease = format!("--force-with-lease={remote_ref}:{lease_target}");
    let args = vec!["push", &lease, remote, &refspec];

    let output = run_git(work_dir, &args, DEFAULT_TIMEOUT_SECS).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if stderr.contains("stale info") || stderr.contains("rejected") {
            return Err(GitError::StaleParent {
                expected: lease_target.to_string(),
                actual: String::new(),
            });
        }
        return Err(classify_failure(&output));
    }
    Ok(())
}

/// Push `local_ref` to `remote_ref` unconditionally (used only to create a
/// brand-new remote branch, where there is nothing to lease against yet).
pub async fn push_new(work_dir: &Path, remote: &str, local_ref: &str, remote_ref: &str) -> GitResult<()> {
    let refspec = format!("{local_ref}:{remote_ref}");
    let args = vec!["push", remote, &refspec];
    let output = run_git(work_dir, &args, DEFAULT_TIMEOUT_SECS).await?;
    if !output.status.success() {
        return Err(classify_failure(&output));
    }
    Ok(())
}
