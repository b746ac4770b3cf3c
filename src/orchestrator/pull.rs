//! The pull pipeline (§4.5 "Pull pipeline").

use std::collections::BTreeSet;

use crate::registry::{ProjectPath, RegistryCache};
use crate::resolver::compute_closure;
use crate::workspace::{WorkspaceError, Workspace};

use super::cancel::CancellationToken;
use super::error::{OrchestratorError, OrchestratorResult};

/// Outcome of a completed pull.
#[derive(Debug, Clone, Default)]
pub struct PullOutcome {
    pub projects: Vec<ProjectPath>,
    pub files_changed: usize,
    pub files_deleted: usize,
}

/// Run the full pull pipeline (§4.5):
///
/// 1. Refresh the cache (unless `offline`) and read its snapshot.
/// 2. Determine the root set: `roots` if non-empty, else every currently
///    pulled project (re-pull). Empty either way aborts with
///    `NothingToPull`.
/// 3. Unless `no_deps`, compute the transitive closure and drop any
///    project this workspace owns (a workspace never pulls what it
///    publishes).
/// 4. Plan: for every target, diff local vs. registry files. Any
///    would-be deletion aborts the whole pull before a single byte is
///    written, unless `force`.
/// 5. Execute: write/delete per project and commit the lock file.
pub async fn pull(
    workspace: &Workspace,
    cache: &RegistryCache,
    cancel: &CancellationToken,
    roots: &[ProjectPath],
    offline: bool,
    no_deps: bool,
    force: bool,
    include_prefix: Option<&str>,
) -> OrchestratorResult<PullOutcome> {
    if !offline {
        cancel.check()?;
        cache.refresh().await?;
    }
    let snapshot = cache.snapshot()?;

    let root_set: Vec<ProjectPath> = if !roots.is_empty() {
        roots.to_vec()
    } else {
        workspace.received_projects()?.into_iter().map(|p| p.local_path).collect()
    };

    if root_set.is_empty() {
        return Err(OrchestratorError::NothingToPull);
    }

    let targets: BTreeSet<ProjectPath> = if no_deps {
        root_set.into_iter().collect()
    } else {
        compute_closure(cache, &root_set, &snapshot, include_prefix)?.closure
    };

    // A pulled project's vendor-relative directory mirrors its full
    // registry path (§3), so "owned by this workspace" means the
    // *registry* path, not the bare local one.
    let owned_registry_paths: BTreeSet<ProjectPath> = workspace
        .owned_projects()?
        .into_iter()
        .map(|p| workspace.registry_path(&p.local_path))
        .collect();

    let targets: Vec<ProjectPath> = targets
        .into_iter()
        .filter(|registry_path| !owned_registry_paths.contains(registry_path))
        .collect();

    // Plan phase (§4.5 step 4): every deletion is computed before any
    // write happens, so a DeletionWouldOccur leaves the workspace
    // untouched regardless of which project in the batch triggered it.
    struct Plan {
        project: ProjectPath,
        files: Vec<crate::registry::ProjectFile>,
        to_delete: Vec<String>,
    }

    let mut plans = Vec::with_capacity(targets.len());
    for registry_path in &targets {
        cancel.check()?;

        let registry_files = cache.list_project_files(registry_path, &snapshot)?;
        let registry_paths: BTreeSet<&str> = registry_files.iter().map(|f| f.path.as_str()).collect();

        let local_files = workspace.list_vendor_project_files(registry_path)?;
        let to_delete: Vec<String> = local_files
            .into_iter()
            .filter(|f| !registry_paths.contains(f.as_str()))
            .collect();

        if !to_delete.is_empty() && !force {
            return Err(OrchestratorError::DeletionWouldOccur {
                project: registry_path.clone(),
                first: to_delete[0].clone(),
                paths: to_delete,
            });
        }

        plans.push(Plan { project: registry_path.clone(), files: registry_files, to_delete });
    }

    let mut outcome = PullOutcome {
        projects: targets,
        ..Default::default()
    };

    for plan in plans {
        cancel.check()?;

        let mut receiver = workspace.receive(&plan.project);
        for file in &plan.files {
            cancel.check()?;
            let mut writer = receiver.create_file(&file.path)?;
            cache.read_project_file(&file.hash, &mut writer)?;
            let changed = writer.close().map_err(WorkspaceError::from)?;
            receiver.record_write(changed);
        }
        for rel in &plan.to_delete {
            receiver.delete_file(rel)?;
        }

        let summary = receiver.finish(&snapshot)?;
        outcome.files_changed += summary.files_changed;
        outcome.files_deleted += summary.files_deleted;
    }

    Ok(outcome)
}
