//! Project-claim checking (§4.2 "Key algorithms" / "Ownership", §9).
//!
//! A pure function of a snapshot: no mutation, so it is safe to call
//! speculatively before staging anything, and to re-call after a
//! `refresh` without side effects.

use super::cache::RegistryCache;
use super::error::RegistryResult;
use super::project::ProjectPath;

/// Outcome of checking whether `repo_url` may publish `path` at
/// `snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// `path` does not exist yet, and nothing at `snapshot` overlaps it.
    OkNew,
    /// `path` exists and is already owned by `repo_url`.
    OkExistingOwner,
    /// `path` exists but is owned by a different repository.
    ConflictOwner(String),
    /// An ancestor of `path` is already a project — overlap is absolute
    /// and does not depend on who owns it (§3, §4.2): `(ancestor_path,
    /// owner_url)`.
    ConflictParent(ProjectPath, String),
    /// One or more descendants of `path` are already projects — same
    /// owner-independent overlap rule as `ConflictParent`.
    ConflictChildren(Vec<String>),
}

/// Check whether `repo_url` may claim `path` at `snapshot`. Looks at:
/// exact match (existing owner), every strict ancestor of `path` (parent
/// conflict), and every project nested under `path` (children conflict).
pub fn check_project_claim(
    cache: &RegistryCache,
    snapshot: &str,
    repo_url: &str,
    path: &ProjectPath,
) -> RegistryResult<ClaimResult> {
    if let Some((project, _tree)) = cache.lookup_project(path, snapshot)? {
        return Ok(if project.source_repo_url == repo_url {
            ClaimResult::OkExistingOwner
        } else {
            ClaimResult::ConflictOwner(project.source_repo_url)
        });
    }

    let all_projects = cache.list_projects(None, snapshot)?;

    for existing in &all_projects {
        if existing.is_strict_ancestor_of(path) {
            if let Some((project, _)) = cache.lookup_project(existing, snapshot)? {
                return Ok(ClaimResult::ConflictParent(existing.clone(), project.source_repo_url));
            }
        }
    }

    let mut conflicting_children = Vec::new();
    for existing in &all_projects {
        if path.is_strict_ancestor_of(existing) {
            if cache.lookup_project(existing, snapshot)?.is_some() {
                conflicting_children.push(existing.as_str().to_string());
            }
        }
    }
    if !conflicting_children.is_empty() {
        conflicting_children.sort();
        return Ok(ClaimResult::ConflictChildren(conflicting_children));
    }

    Ok(ClaimResult::OkNew)
}
