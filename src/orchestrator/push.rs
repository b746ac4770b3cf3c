//! The push pipeline (§4.5 "Push pipeline").

use crate::git::{Identity, Repo, normalize_remote_url};
use crate::registry::{ClaimResult, ProjectPath, RegistryCache, any_overlap, check_project_claim};
use crate::workspace::Workspace;

use super::cancel::CancellationToken;
use super::error::{OrchestratorError, OrchestratorResult};
use super::retry::{RetryPolicy, with_retry};
use super::validate::validate_chain;

/// Outcome of a completed (or no-op) push.
#[derive(Debug, Clone, Default)]
pub struct PushOutcome {
    pub projects_updated: Vec<ProjectPath>,
    /// `None` when there were no owned projects to push (§4.5 step 1).
    pub snapshot: Option<String>,
}

/// Run the full push pipeline: enumerate owned projects, check ownership
/// claims, stage a commit chain, optionally validate, and push with
/// lease-retry.
pub async fn push(
    workspace: &Workspace,
    producer_repo: &Repo,
    cache: &RegistryCache,
    retry: RetryPolicy,
    cancel: &CancellationToken,
    validate: bool,
    include_prefix: Option<&str>,
) -> OrchestratorResult<PushOutcome> {
    let owned = workspace.owned_projects()?;
    if owned.is_empty() {
        return Ok(PushOutcome::default());
    }

    let registry_paths: Vec<ProjectPath> = owned.iter().map(|p| workspace.registry_path(&p.local_path)).collect();
    if let Some((a, b)) = any_overlap(&registry_paths) {
        return Err(OrchestratorError::ProjectsOverlap { a, b });
    }

    let head = producer_repo.rev_hash("HEAD")?;
    let remote_url = normalize_remote_url(&producer_repo.get_remote_url("origin")?);
    let (name, email) = producer_repo.get_user()?;
    let author = Identity {
        name,
        email,
        time: gix::date::Time::now_local_or_utc(),
    };

    with_retry(retry, cancel, |_attempt| async {
        cache.refresh().await?;

        let base_snapshot = cache.snapshot()?;
        let remote_has_branch = cache.remote_has_branch();

        if let Some(conflict) = find_claim_conflict(workspace, cache, &base_snapshot, &remote_url, &owned)? {
            return Err(conflict);
        }

        let mut current_snapshot = base_snapshot.clone();
        let mut updated = Vec::with_capacity(owned.len());

        for project in &owned {
            cancel.check()?;
            let registry_path = workspace.registry_path(&project.local_path);
            let files = read_project_files(workspace, project)?;
            current_snapshot = cache.set_project(&registry_path, &files, &current_snapshot, &author, &remote_url, &head)?;
            updated.push(registry_path);
        }

        if validate {
            validate_chain(cache, &updated, &current_snapshot, include_prefix)?;
        }

        let lease_target = remote_has_branch.then_some(base_snapshot.as_str());
        cache.push(&current_snapshot, lease_target).await?;

        Ok(PushOutcome {
            projects_updated: updated,
            snapshot: Some(current_snapshot),
        })
    })
    .await
}

fn find_claim_conflict(
    workspace: &Workspace,
    cache: &RegistryCache,
    snapshot: &str,
    remote_url: &str,
    owned: &[crate::workspace::OwnedProject],
) -> OrchestratorResult<Option<OrchestratorError>> {
    for project in owned {
        let registry_path = workspace.registry_path(&project.local_path);
        match check_project_claim(cache, snapshot, remote_url, &registry_path)? {
            ClaimResult::OkNew | ClaimResult::OkExistingOwner => {}
            ClaimResult::ConflictOwner(owner) => {
                return Ok(Some(OrchestratorError::ConflictOwner { path: registry_path, owner }));
            }
            ClaimResult::ConflictParent(parent, owner) => {
                return Ok(Some(OrchestratorError::ConflictParent {
                    path: registry_path,
                    parent,
                    owner,
                }));
            }
            ClaimResult::ConflictChildren(children) => {
                return Ok(Some(OrchestratorError::ConflictChildren { path: registry_path, children }));
            }
        }
    }
    Ok(None)
}

fn read_project_files(
    workspace: &Workspace,
    project: &crate::workspace::OwnedProject,
) -> OrchestratorResult<Vec<(String, Vec<u8>)>> {
    let files = workspace.list_owned_project_files(project)?;
    let project_dir = workspace.owned_dir().join(project.local_path.as_str());
    let mut out = Vec::with_capacity(files.len());
    for rel in files {
        let bytes = std::fs::read(project_dir.join(&rel)).map_err(crate::git::GitError::Io)?;
        out.push((rel, bytes));
    }
    Ok(out)
}
