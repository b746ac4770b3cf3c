//! The verify pipeline (§4.5 "Verify pipeline").
//!
//! Purely local + cache reads: no `refresh`, no writes. Ownership
//! conflicts are the only error-class finding; everything else (local
//! drift, orphans) is a warning the caller decides how to surface.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::registry::{ClaimResult, ProjectPath, RegistryCache, check_project_claim};
use crate::workspace::{OrphanFile, Workspace};

use super::error::OrchestratorResult;

/// How a pulled project's local file differs from its recorded snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerdict {
    AddedLocally,
    ModifiedLocally,
    DeletedLocally,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub project: ProjectPath,
    pub path: String,
    pub verdict: FileVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipConflict {
    pub project: ProjectPath,
    pub owner: String,
}

/// Result of a verify run. `ownership_conflicts` are errors (§4.5: "Overall
/// exit status is failure iff any error ... was reported"); `file_diffs`
/// and `orphans` are warnings.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub file_diffs: Vec<FileDiff>,
    pub ownership_conflicts: Vec<OwnershipConflict>,
    pub orphans: Vec<OrphanFile>,
}

impl VerifyReport {
    pub fn has_errors(&self) -> bool {
        !self.ownership_conflicts.is_empty()
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Run a full verify: diff every pulled project's local files against its
/// recorded lock snapshot, check ownership claims for every owned
/// project against `remote_url`, and surface orphans.
pub fn verify(workspace: &Workspace, cache: &RegistryCache, remote_url: &str) -> OrchestratorResult<VerifyReport> {
    let mut file_diffs = Vec::new();

    for pulled in workspace.received_projects()? {
        let registry_path = pulled.local_path.clone();
        let registry_files = cache.list_project_files(&registry_path, &pulled.snapshot)?;
        let registry_by_path: BTreeMap<&str, &str> =
            registry_files.iter().map(|f| (f.path.as_str(), f.hash.as_str())).collect();

        let local_files = workspace.list_vendor_project_files(&pulled.local_path)?;
        let local_set: BTreeSet<&str> = local_files.iter().map(String::as_str).collect();

        for (path, hash) in &registry_by_path {
            if !local_set.contains(path) {
                file_diffs.push(FileDiff {
                    project: registry_path.clone(),
                    path: (*path).to_string(),
                    verdict: FileVerdict::DeletedLocally,
                });
                continue;
            }

            let local_bytes =
                std::fs::read(workspace.vendor_dir().join(pulled.local_path.as_str()).join(path))
                    .map_err(crate::workspace::WorkspaceError::Io)?;
            let mut registry_bytes = Vec::new();
            cache.read_project_file(hash, &mut registry_bytes)?;

            if digest(&local_bytes) != digest(&registry_bytes) {
                file_diffs.push(FileDiff {
                    project: registry_path.clone(),
                    path: (*path).to_string(),
                    verdict: FileVerdict::ModifiedLocally,
                });
            }
        }

        for path in &local_set {
            if !registry_by_path.contains_key(path) {
                file_diffs.push(FileDiff {
                    project: registry_path.clone(),
                    path: (*path).to_string(),
                    verdict: FileVerdict::AddedLocally,
                });
            }
        }
    }

    let mut ownership_conflicts = Vec::new();
    let snapshot = cache.snapshot()?;
    for owned in workspace.owned_projects()? {
        let registry_path = workspace.registry_path(&owned.local_path);
        if let ClaimResult::ConflictOwner(owner) =
            check_project_claim(cache, &snapshot, remote_url, &registry_path)?
        {
            ownership_conflicts.push(OwnershipConflict { project: registry_path, owner });
        }
    }

    let orphans = workspace.orphaned_files()?;

    Ok(VerifyReport { file_diffs, ownership_conflicts, orphans })
}
