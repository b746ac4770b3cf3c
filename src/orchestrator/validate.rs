//! Proto compile-time validation (§4.5 push step 6, §7 `ValidationError`).
//!
//! Unless `--no-validate`, every about-to-be-published project is parsed
//! with a real proto compiler (`protox`) over the files of the chained,
//! not-yet-pushed snapshot — so imports see the about-to-be-published
//! state, not whatever is already on the remote. The resolver's own
//! unresolved-import check runs first as a cheap pre-filter with a more
//! specific error message; `protox` then does the actual parse/link.

use crate::registry::{ProjectPath, RegistryCache};
use crate::resolver::compute_closure;

use super::error::{OrchestratorError, OrchestratorResult};

/// Validate every file of every project in `updated`, against the full
/// transitive closure materialized from `snapshot`.
pub fn validate_chain(
    cache: &RegistryCache,
    updated: &[ProjectPath],
    snapshot: &str,
    include_prefix: Option<&str>,
) -> OrchestratorResult<()> {
    let Some(primary) = updated.first() else {
        return Ok(());
    };

    let closure_result = compute_closure(cache, updated, snapshot, include_prefix)?;
    if let Some(first) = closure_result.unresolved.first() {
        return Err(OrchestratorError::ValidationError {
            project: primary.clone(),
            reason: format!("unresolved import '{}' in '{}'", first.import, first.file),
        });
    }

    let workdir = tempfile::tempdir().map_err(crate::git::GitError::Io)?;
    let include_root = match include_prefix {
        Some(prefix) => workdir.path().join(prefix),
        None => workdir.path().to_path_buf(),
    };

    let mut root_files = Vec::new();
    for project in &closure_result.closure {
        for file in cache.list_project_files(project, snapshot)? {
            let mut bytes = Vec::new();
            cache.read_project_file(&file.hash, &mut bytes)?;

            let dest = include_root.join(project.as_str()).join(&file.path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(crate::git::GitError::Io)?;
            }
            std::fs::write(&dest, &bytes).map_err(crate::git::GitError::Io)?;

            if updated.contains(project) {
                root_files.push(dest);
            }
        }
    }

    protox::compile(&root_files, [workdir.path()]).map_err(|e| OrchestratorError::ValidationError {
        project: primary.clone(),
        reason: e.to_string(),
    })?;

    Ok(())
}
