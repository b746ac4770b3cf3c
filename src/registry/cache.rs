//! The registry cache (§4.2): a bare mirror of the registry repository,
//! addressed by snapshot (commit hash).
//!
//! Grounded on the teacher's `RepoHandle` (cheap-clone wrapper around
//! `gix::Repository`) for the object-database access, and on
//! `coralogix/protofetch`'s `ProtoGitRepository::extract_descriptor`
//! pattern of resolving `"{commit}:{path}"` revision specs to read a
//! specific file out of a specific snapshot without materializing a
//! worktree.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gix::bstr::ByteSlice;

use crate::git::{self, EntryType, Identity, NewTreeEntry, OpenOpts, Repo};

use super::error::{RegistryError, RegistryResult};
use super::project::{GitMetadata, METADATA_FILE, PROTOS_ROOT, Project, ProjectMetadata, ProjectPath};

/// One file belonging to a project at a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    /// Path relative to the project root.
    pub path: String,
    pub hash: String,
}

/// A bare-clone mirror of a registry, keyed by the registry's remote URL.
pub struct RegistryCache {
    repo: Repo,
    remote_url: String,
    branch: String,
    /// Per-snapshot project enumeration, memoized for the lifetime of this
    /// handle (§4.2 "Key algorithms" / "Project enumeration").
    project_index: Mutex<HashMap<String, Vec<ProjectPath>>>,
}

/// Turn a registry URL into a filesystem-safe cache directory name.
/// Strips the scheme, keeps host-and-path, replaces path separators and
/// any other non-alphanumeric byte with `_`.
pub fn slug(url: &str) -> String {
    let normalized = git::normalize_remote_url(url);
    let stripped = normalized
        .strip_prefix("https://")
        .unwrap_or(&normalized);
    stripped
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

impl RegistryCache {
    /// Open the bare mirror for `remote_url` under `cache_dir`, cloning it
    /// first if this is the first time this URL has been seen.
    pub fn open(cache_dir: &Path, remote_url: &str, branch: &str) -> RegistryResult<Self> {
        let path = cache_dir.join(slug(remote_url));
        let repo = if path.join("HEAD").is_file() {
            Repo::open(&path, OpenOpts { bare: true })?
        } else {
            std::fs::create_dir_all(cache_dir).map_err(crate::git::GitError::Io)?;
            Repo::clone_bare(remote_url, &path)?
        };

        Ok(Self {
            repo,
            remote_url: remote_url.to_string(),
            branch: branch.to_string(),
            project_index: Mutex::new(HashMap::new()),
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        self.repo.root()
    }

    /// Fetch from the remote with prune. Bounded retry against transient
    /// network failure lives in `orchestrator::retry`; this call either
    /// succeeds or returns a `NetworkError`/`AuthError` for the caller to
    /// classify.
    pub async fn refresh(&self) -> RegistryResult<()> {
        git::fetch(&self.repo.root(), "origin", None, true).await?;
        Ok(())
    }

    /// The tip of the tracking branch, treated as the registry's `HEAD`.
    /// Callable without a prior `refresh` (offline mode) — it simply
    /// reflects whatever was last fetched. A registry that has never been
    /// pushed to (the remote branch doesn't exist yet) synthesizes an
    /// empty-tree root commit as its snapshot, so a first-ever `push` has
    /// a real, read-by-`read_tree` base to stage its project subtree into.
    pub fn snapshot(&self) -> RegistryResult<String> {
        let rev = git::branch_full_name(&self.branch);
        match self.repo.rev_hash(&rev) {
            Ok(hash) => Ok(hash),
            Err(_) => self.bootstrap_snapshot(),
        }
    }

    /// Whether the remote, as of the most recent `refresh`, already has
    /// commits on the tracking branch. `false` means nobody has ever
    /// pushed to this registry: the orchestrator uses this to choose
    /// between an unconditional first push (`push_new`) and a leased one.
    pub fn remote_has_branch(&self) -> bool {
        self.repo.rev_exists(&git::branch_full_name(&self.branch))
    }

    /// Build (but do not reference) an empty-tree root commit, used as
    /// the base snapshot when the registry has no history yet. Nothing
    /// is written to any ref here — `set_project`'s `update_ref` is what
    /// eventually makes a chain built atop this commit visible locally,
    /// and `push` is what makes it visible to anyone else.
    fn bootstrap_snapshot(&self) -> RegistryResult<String> {
        let empty_tree = git::write_tree(&self.repo, &[])?;
        let identity = Identity {
            name: "protato".to_string(),
            email: "protato@localhost".to_string(),
            time: gix::date::Time::now_local_or_utc(),
        };
        let commit = git::commit(&self.repo, &empty_tree, &[], &identity, &identity, "initialize registry")?;
        Ok(commit)
    }

    /// Every project path whose directory contains the metadata file at
    /// `snapshot`, optionally filtered to those starting with `prefix`.
    pub fn list_projects(&self, prefix: Option<&str>, snapshot: &str) -> RegistryResult<Vec<ProjectPath>> {
        let all = self.project_index(snapshot)?;
        let filtered = match prefix {
            None => all,
            Some(prefix) => all
                .into_iter()
                .filter(|p| p.as_str() == prefix || p.as_str().starts_with(&format!("{prefix}/")))
                .collect(),
        };
        Ok(filtered)
    }

    fn project_index(&self, snapshot: &str) -> RegistryResult<Vec<ProjectPath>> {
        {
            let cached = self.project_index.lock().unwrap();
            if let Some(hit) = cached.get(snapshot) {
                return Ok(hit.clone());
            }
        }

        let computed = self.enumerate_projects(snapshot)?;
        self.project_index
            .lock()
            .unwrap()
            .insert(snapshot.to_string(), computed.clone());
        Ok(computed)
    }

    fn enumerate_projects(&self, snapshot: &str) -> RegistryResult<Vec<ProjectPath>> {
        let root = format!("{snapshot}:{PROTOS_ROOT}");
        let entries = match git::read_tree(&self.repo, &root, true) {
            Ok(entries) => entries,
            // No `protos/` directory yet means an empty registry.
            Err(_) => return Ok(Vec::new()),
        };

        let mut projects: Vec<ProjectPath> = entries
            .into_iter()
            .filter(|e| e.kind == EntryType::Blob && e.path.ends_with(METADATA_FILE))
            .filter_map(|e| {
                let dir = e.path.strip_suffix(METADATA_FILE)?.trim_end_matches('/');
                if dir.is_empty() {
                    None
                } else {
                    ProjectPath::parse(dir).ok()
                }
            })
            .collect();

        projects.sort();
        projects.dedup();
        Ok(projects)
    }

    /// Exact-path lookup of a project at `snapshot`. Returns `Ok(None)`
    /// for a missing project — per §4.2, `NotFound` here is data, not an
    /// error.
    pub fn lookup_project(
        &self,
        path: &ProjectPath,
        snapshot: &str,
    ) -> RegistryResult<Option<(Project, String)>> {
        let metadata_spec = format!("{snapshot}:{}", path.metadata_path());
        let Some(metadata_id) = self.resolve_optional(&metadata_spec) else {
            return Ok(None);
        };

        let bytes = git::read_blob_bytes(&self.repo, &metadata_id)?;
        let text = String::from_utf8_lossy(&bytes);
        let metadata = ProjectMetadata::from_yaml(&text)
            .map_err(|e| crate::git::GitError::GitCommand(format!("bad metadata for {path}: {e}")))?;

        let tree_spec = format!("{snapshot}:{}", path.registry_dir());
        let tree_id = self
            .resolve_optional(&tree_spec)
            .ok_or_else(|| RegistryError::NotFound(path.clone()))?;

        Ok(Some((
            Project {
                path: path.clone(),
                source_commit: metadata.git.commit,
                source_repo_url: metadata.git.url,
            },
            tree_id,
        )))
    }

    /// Every blob under `project`'s root tree at `snapshot`, excluding the
    /// metadata file, ordered lexicographically on path.
    pub fn list_project_files(&self, project: &ProjectPath, snapshot: &str) -> RegistryResult<Vec<ProjectFile>> {
        let spec = format!("{snapshot}:{}", project.registry_dir());
        let Some(tree_id) = self.resolve_optional(&spec) else {
            return Err(RegistryError::NotFound(project.clone()));
        };

        let mut files: Vec<ProjectFile> = git::read_tree(&self.repo, &tree_id, true)?
            .into_iter()
            .filter(|e| e.kind == EntryType::Blob && e.path != METADATA_FILE)
            .map(|e| ProjectFile { path: e.path, hash: e.hash })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Stream a single project file's content (by blob hash, as returned
    /// from `list_project_files`) to `writer`.
    pub fn read_project_file(&self, blob_hash: &str, writer: &mut impl Write) -> RegistryResult<()> {
        git::read_blob(&self.repo, blob_hash, writer)?;
        Ok(())
    }

    /// Resolve `spec` (a `"<rev>:<path>"` expression) to a hash, treating
    /// any resolution failure as "doesn't exist" rather than propagating
    /// an error — mirrors `protofetch`'s `NotFound` handling around
    /// `revparse_single("{commit}:protofetch.toml")`.
    fn resolve_optional(&self, spec: &str) -> Option<String> {
        self.repo
            .raw()
            .rev_parse_single(spec.as_bytes().as_bstr())
            .ok()
            .map(|id| id.detach().to_string())
    }

    /// Stage a new commit whose tree equals `base_snapshot`'s tree with
    /// `project`'s subtree replaced by exactly `files` plus a regenerated
    /// metadata file. Returns the new (unpushed, not yet ref-advanced)
    /// snapshot hash. See `registry::staging` for the tree composition
    /// algorithm.
    pub fn set_project(
        &self,
        project: &ProjectPath,
        files: &[(String, Vec<u8>)],
        base_snapshot: &str,
        author: &Identity,
        repo_url: &str,
        repo_commit: &str,
    ) -> RegistryResult<String> {
        let new_snapshot = super::staging::stage_project_update(
            &self.repo,
            project,
            files,
            base_snapshot,
            author,
            repo_url,
            repo_commit,
        )?;
        git::update_ref(&self.repo, &self.branch, &new_snapshot)?;
        Ok(new_snapshot)
    }

    /// Push the local tracking branch (currently at `snapshot`) to the
    /// remote. `lease_target` is the snapshot observed at the most
    /// recent `refresh`, used as the force-with-lease expected value;
    /// `None` means the remote had no commits on this branch as of that
    /// refresh (`remote_has_branch() == false`), so the push is
    /// unconditional (`push_new`) rather than leased — there is nothing
    /// to lease against on a branch that doesn't exist yet. On success
    /// the remote's tip now equals `snapshot`; on `StaleParent` the
    /// caller should `refresh` and retry.
    pub async fn push(&self, snapshot: &str, lease_target: Option<&str>) -> RegistryResult<()> {
        let remote_ref = git::branch_full_name(&self.branch);
        let local_ref = git::branch_full_name(&self.branch);
        match lease_target {
            Some(lease) => {
                git::push_with_lease(&self.repo.root(), "origin", &local_ref, &remote_ref, lease).await?;
            }
            None => {
                git::push_new(&self.repo.root(), "origin", &local_ref, &remote_ref).await?;
            }
        }
        // Local ref already points at `snapshot`; nothing else to update.
        let _ = snapshot;
        Ok(())
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// Ad-hoc git metadata bundle passed around the orchestrator; kept here
/// since it shares the `GitMetadata` shape with `ProjectMetadata`.
#[derive(Debug, Clone)]
pub struct PublishIdentity {
    pub url: String,
    pub commit: String,
}

impl From<PublishIdentity> for GitMetadata {
    fn from(value: PublishIdentity) -> Self {
        GitMetadata { commit: value.commit, url: value.url }
    }
}
