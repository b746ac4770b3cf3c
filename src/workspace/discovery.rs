//! Project discovery (§4.3 "Algorithms" / "Project discovery", §9 open
//! question on the `owned == vendor` case).

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::registry::ProjectPath;

use super::config::WorkspaceConfig;
use super::error::WorkspaceResult;
use super::patterns::PatternSet;
use super::receiver::LOCK_FILE;

/// A directory under `ownedDir` the workspace may `push`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OwnedProject {
    pub local_path: ProjectPath,
}

/// A directory under `vendorDir` the workspace has `pull`ed. Unlike an
/// owned project, `local_path` already *is* the full registry path:
/// vendored directories mirror the registry's flat namespace verbatim
/// (§3), since a pulled project almost always belongs to some other
/// producer's service namespace, not this workspace's own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PulledProject {
    pub local_path: ProjectPath,
    pub snapshot: String,
}

fn has_proto_file(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|e| e.path().extension().is_some_and(|ext| ext == "proto"))
        })
        .unwrap_or(false)
}

fn has_lock_file(dir: &Path) -> bool {
    dir.join(LOCK_FILE).is_file()
}

/// Every directory under `owned_dir` containing at least one `.proto`
/// file, classified and filtered per §4.3/§9:
///
/// - directories containing a lock file are pulled, not owned, and
///   excluded here unconditionally;
/// - if `vendor_dir` is a descendant of `owned_dir`, that subtree is
///   skipped entirely rather than walked and filtered out one-by-one;
/// - when `auto_discover` is false, a candidate's path (relative to
///   `owned_dir`) must match `project_patterns`; when true, every
///   candidate qualifies;
/// - `ignore_patterns` then removes matches regardless of
///   `auto_discover`.
pub fn owned_projects(
    root: &Path,
    config: &WorkspaceConfig,
    project_patterns: &PatternSet,
    ignore_patterns: &PatternSet,
) -> WorkspaceResult<Vec<OwnedProject>> {
    let owned_dir = root.join(&config.directories.owned);
    let vendor_dir = root.join(&config.directories.vendor);
    let skip_vendor_subtree = vendor_dir.starts_with(&owned_dir) && vendor_dir != owned_dir;

    if !owned_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = BTreeSet::new();

    let walker = WalkDir::new(&owned_dir).into_iter().filter_entry(|entry| {
        if !entry.file_type().is_dir() {
            return true;
        }
        if skip_vendor_subtree && entry.path() == vendor_dir {
            return false;
        }
        true
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if dir == owned_dir {
            continue;
        }
        if has_lock_file(dir) {
            continue;
        }
        if !has_proto_file(dir) {
            continue;
        }

        let rel = dir
            .strip_prefix(&owned_dir)
            .unwrap_or(dir)
            .to_string_lossy()
            .replace('\\', "/");

        let Ok(path) = ProjectPath::parse(rel.clone()) else {
            continue;
        };

        if !config.auto_discover && !project_patterns.matches(path.as_str()) {
            continue;
        }
        if ignore_patterns.matches(path.as_str()) {
            continue;
        }

        found.insert(path);
    }

    Ok(found.into_iter().map(|local_path| OwnedProject { local_path }).collect())
}

/// Every directory under `vendor_dir` containing a lock file, excluding
/// those whose registry path (service-prefixed) coincides with an owned
/// project's registry path (§4.3 `receivedProjects`).
pub fn received_projects(
    root: &Path,
    config: &WorkspaceConfig,
    owned: &[OwnedProject],
) -> WorkspaceResult<Vec<PulledProject>> {
    let vendor_dir = root.join(&config.directories.vendor);
    if !vendor_dir.is_dir() {
        return Ok(Vec::new());
    }

    let owned_registry_paths: BTreeSet<String> = owned
        .iter()
        .map(|p| format!("{}/{}", config.service, p.local_path))
        .collect();

    let mut found = BTreeSet::new();

    for entry in WalkDir::new(&vendor_dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if dir == vendor_dir {
            continue;
        }
        if !has_lock_file(dir) {
            continue;
        }

        let rel = dir
            .strip_prefix(&vendor_dir)
            .unwrap_or(dir)
            .to_string_lossy()
            .replace('\\', "/");
        let Ok(local_path) = ProjectPath::parse(rel) else {
            continue;
        };

        if owned_registry_paths.contains(local_path.as_str()) {
            continue;
        }

        let lock_raw = std::fs::read_to_string(dir.join(LOCK_FILE))?;
        let snapshot = super::receiver::parse_lock(&lock_raw)
            .unwrap_or_default();

        found.insert(PulledProject { local_path, snapshot });
    }

    Ok(found.into_iter().collect())
}
