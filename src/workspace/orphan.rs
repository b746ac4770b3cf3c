//! Orphan detection (§4.3): `.proto` files under `ownedDir`/`vendorDir`
//! that don't belong to any currently valid project.

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use super::config::WorkspaceConfig;
use super::discovery::{OwnedProject, PulledProject};
use super::error::WorkspaceResult;

/// A `.proto` file, relative to the workspace root, matching no owned or
/// pulled project directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrphanFile(pub String);

pub fn orphaned_files(
    root: &Path,
    config: &WorkspaceConfig,
    owned: &[OwnedProject],
    pulled: &[PulledProject],
) -> WorkspaceResult<Vec<OrphanFile>> {
    let owned_dir = root.join(&config.directories.owned);
    let vendor_dir = root.join(&config.directories.vendor);
    let skip_vendor_subtree = vendor_dir.starts_with(&owned_dir) && vendor_dir != owned_dir;

    let owned_paths: BTreeSet<&str> = owned.iter().map(|p| p.local_path.as_str()).collect();
    let pulled_paths: BTreeSet<&str> = pulled.iter().map(|p| p.local_path.as_str()).collect();

    let mut orphans = BTreeSet::new();

    if owned_dir.is_dir() {
        let walker = WalkDir::new(&owned_dir).into_iter().filter_entry(|entry| {
            !(skip_vendor_subtree && entry.file_type().is_dir() && entry.path() == vendor_dir)
        });
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().is_none_or(|ext| ext != "proto") {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&owned_dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if !belongs_to_any(&rel, &owned_paths) {
                orphans.insert(OrphanFile(format!("{}/{rel}", config.directories.owned)));
            }
        }
    }

    if vendor_dir.is_dir() {
        for entry in WalkDir::new(&vendor_dir) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().is_none_or(|ext| ext != "proto") {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&vendor_dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if !belongs_to_any(&rel, &pulled_paths) {
                orphans.insert(OrphanFile(format!("{}/{rel}", config.directories.vendor)));
            }
        }
    }

    Ok(orphans.into_iter().collect())
}

fn belongs_to_any(file_rel_path: &str, project_paths: &BTreeSet<&str>) -> bool {
    project_paths
        .iter()
        .any(|p| file_rel_path == *p || file_rel_path.starts_with(&format!("{p}/")))
}
