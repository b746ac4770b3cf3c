//! Transitive closure computation (§4.4 "Algorithm").

use std::collections::{BTreeSet, VecDeque};

use crate::registry::{ProjectPath, RegistryCache};

use super::error::ResolverResult;
use super::scan::{is_well_known, scan_imports, strip_include_prefix};

/// An import target that could not be matched to any registry project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnresolvedImport {
    /// Registry-relative path of the file containing the import.
    pub file: String,
    pub import: String,
}

/// Result of resolving a root set's transitive closure (§4.4 "Outputs").
#[derive(Debug, Clone, Default)]
pub struct ClosureResult {
    pub closure: BTreeSet<ProjectPath>,
    pub unresolved: Vec<UnresolvedImport>,
}

/// Compute the transitive closure of registry projects required to
/// compile `roots` at `snapshot`. `include_prefix` is stripped from every
/// import target before it's matched against registry paths (§4.4
/// "Input").
///
/// Dequeue order is lexicographic on file path (§4.4 "Determinism"): the
/// queue is always drained in sorted order per project, and projects are
/// discovered and enqueued in the order their owning import is found.
pub fn closure(
    cache: &RegistryCache,
    roots: &[ProjectPath],
    snapshot: &str,
    include_prefix: Option<&str>,
) -> ResolverResult<ClosureResult> {
    let all_projects = cache.list_projects(None, snapshot)?;

    let mut discovered: BTreeSet<ProjectPath> = BTreeSet::new();
    let mut visited_files: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut unresolved = Vec::new();

    for root in roots {
        discovered.insert(root.clone());
        enqueue_project_files(cache, root, snapshot, &mut queue)?;
    }

    while let Some(file_path) = queue.pop_front() {
        if !visited_files.insert(file_path.clone()) {
            continue;
        }

        let Some(hash) = file_blob_hash(cache, &file_path, snapshot)? else {
            continue;
        };

        let mut bytes = Vec::new();
        cache.read_project_file(&hash, &mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);

        for import in scan_imports(&text) {
            if is_well_known(&import) {
                continue;
            }
            let Some(registry_relative) = strip_include_prefix(&import, include_prefix) else {
                unresolved.push(UnresolvedImport { file: file_path.clone(), import });
                continue;
            };

            match longest_owning_project(&all_projects, registry_relative) {
                Some(owner) => {
                    if discovered.insert(owner.clone()) {
                        enqueue_project_files(cache, &owner, snapshot, &mut queue)?;
                    }
                }
                None => unresolved.push(UnresolvedImport { file: file_path.clone(), import }),
            }
        }
    }

    unresolved.sort();
    unresolved.dedup();

    Ok(ClosureResult { closure: discovered, unresolved })
}

fn enqueue_project_files(
    cache: &RegistryCache,
    project: &ProjectPath,
    snapshot: &str,
    queue: &mut VecDeque<String>,
) -> ResolverResult<()> {
    let mut files = cache.list_project_files(project, snapshot)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    for file in files {
        queue.push_back(format!("{project}/{}", file.path));
    }
    Ok(())
}

fn file_blob_hash(cache: &RegistryCache, registry_file_path: &str, snapshot: &str) -> ResolverResult<Option<String>> {
    let Some((project, rel_path)) = owning_project_of_file(cache, registry_file_path, snapshot)? else {
        return Ok(None);
    };
    let files = cache.list_project_files(&project, snapshot)?;
    Ok(files.into_iter().find(|f| f.path == rel_path).map(|f| f.hash))
}

fn owning_project_of_file(
    cache: &RegistryCache,
    registry_file_path: &str,
    snapshot: &str,
) -> ResolverResult<Option<(ProjectPath, String)>> {
    let all_projects = cache.list_projects(None, snapshot)?;
    let Some(owner) = longest_owning_project(&all_projects, registry_file_path) else {
        return Ok(None);
    };
    let rel_path = registry_file_path
        .strip_prefix(&format!("{owner}/"))
        .unwrap_or(registry_file_path)
        .to_string();
    Ok(Some((owner, rel_path)))
}

/// The longest project path that is an ancestor of `path` (§4.4 step 3).
fn longest_owning_project(projects: &[ProjectPath], path: &str) -> Option<ProjectPath> {
    projects
        .iter()
        .filter(|p| path.starts_with(&format!("{p}/")) || path == p.as_str())
        .max_by_key(|p| p.as_str().len())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_owning_project_prefers_deepest_match() {
        let projects = vec![
            ProjectPath::parse("team").unwrap(),
            ProjectPath::parse("team/service").unwrap(),
        ];
        let owner = longest_owning_project(&projects, "team/service/v1/x.proto");
        assert_eq!(owner, Some(ProjectPath::parse("team/service").unwrap()));
    }

    #[test]
    fn longest_owning_project_none_when_no_ancestor() {
        let projects = vec![ProjectPath::parse("team/a").unwrap()];
        assert_eq!(longest_owning_project(&projects, "team/b/x.proto"), None);
    }
}
