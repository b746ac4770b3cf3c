//! `list` / `mine` data gathering (§4.5 "List / Mine"). Deterministic,
//! sorted — the `cli` layer is responsible for text formatting only.

use crate::registry::{ProjectPath, RegistryCache};
use crate::workspace::Workspace;

use super::error::OrchestratorResult;

/// Whether a local project entry is published by this workspace or
/// consumed from the registry. Declared before `path`/`snapshot_prefix`
/// in `LocalProjectEntry` so the derived `Ord` sorts owned before pulled
/// at an equal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocalProjectKind {
    Owned,
    Pulled,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalProjectEntry {
    pub registry_path: ProjectPath,
    pub kind: LocalProjectKind,
    /// `None` for owned projects, which carry no recorded snapshot
    /// locally (the registry is their source of truth, not the other
    /// way around).
    pub snapshot_prefix: Option<String>,
}

/// The short display prefix of a full hash (§3: "a short 7-character
/// prefix is used only for display").
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(7)]
}

/// `list --local`: every owned + pulled project known to this workspace,
/// sorted by path then kind.
pub fn local_projects(workspace: &Workspace) -> OrchestratorResult<Vec<LocalProjectEntry>> {
    let mut entries: Vec<LocalProjectEntry> = workspace
        .owned_projects()?
        .into_iter()
        .map(|p| LocalProjectEntry {
            registry_path: workspace.registry_path(&p.local_path),
            kind: LocalProjectKind::Owned,
            snapshot_prefix: None,
        })
        .collect();

    entries.extend(workspace.received_projects()?.into_iter().map(|p| LocalProjectEntry {
        registry_path: p.local_path,
        kind: LocalProjectKind::Pulled,
        snapshot_prefix: Some(short_hash(&p.snapshot).to_string()),
    }));

    entries.sort();
    Ok(entries)
}

/// `list` (no `--local`): every registry project at `snapshot`.
pub fn registry_projects(
    cache: &RegistryCache,
    snapshot: &str,
    prefix: Option<&str>,
) -> OrchestratorResult<Vec<ProjectPath>> {
    let mut projects = cache.list_projects(prefix, snapshot)?;
    projects.sort();
    Ok(projects)
}

/// `mine --projects` / `mine` bare: every owned project's path.
pub fn mine_projects(workspace: &Workspace) -> OrchestratorResult<Vec<ProjectPath>> {
    let mut paths: Vec<ProjectPath> = workspace
        .owned_projects()?
        .into_iter()
        .map(|p| workspace.registry_path(&p.local_path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// `mine --absolute` / `mine` default: every owned `.proto` file, by path
/// relative to the owned directory, or absolute on disk when
/// `absolute` is set.
pub fn mine_files(workspace: &Workspace, absolute: bool) -> OrchestratorResult<Vec<String>> {
    let mut files = Vec::new();
    for project in workspace.owned_projects()? {
        for rel in workspace.list_owned_project_files(&project)? {
            let project_rel = format!("{}/{rel}", project.local_path);
            if absolute {
                let abs = workspace.owned_dir().join(project.local_path.as_str()).join(&rel);
                files.push(abs.to_string_lossy().into_owned());
            } else {
                files.push(project_rel);
            }
        }
    }
    files.sort();
    Ok(files)
}
