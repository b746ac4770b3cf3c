//! The workspace model (§4.3): the bidirectional mapping between a
//! producer's on-disk layout and the registry's flat namespace.

mod config;
mod discovery;
mod error;
mod orphan;
mod patterns;
mod receiver;

pub use config::{CONFIG_FILE, Directories, WorkspaceConfig};
pub use discovery::{OwnedProject, PulledProject};
pub use error::{WorkspaceError, WorkspaceResult};
pub use orphan::OrphanFile;
pub use patterns::PatternSet;
pub use receiver::{FileWriter, GITATTRIBUTES_FILE, LOCK_FILE, ReceiveSummary, Receiver};

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::registry::ProjectPath;

/// A loaded workspace: its root directory plus the parsed
/// `protato.yaml`. All project/file enumeration happens relative to this.
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    project_patterns: PatternSet,
    ignore_patterns: PatternSet,
}

impl Workspace {
    /// Write `config` at `root`. Refuses to overwrite an existing
    /// `protato.yaml` unless `force`.
    pub fn init(root: &Path, config: WorkspaceConfig, force: bool) -> WorkspaceResult<Self> {
        let saved = config::save(root, &config, force)?;
        Self::from_config(root, saved)
    }

    /// Load an existing workspace at `root`.
    pub fn open(root: &Path) -> WorkspaceResult<Self> {
        let config = config::load(root)?;
        Self::from_config(root, config)
    }

    fn from_config(root: &Path, config: WorkspaceConfig) -> WorkspaceResult<Self> {
        let project_patterns = PatternSet::compile(&config.projects)?;
        let ignore_patterns = PatternSet::compile(&config.ignores)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            project_patterns,
            ignore_patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn owned_dir(&self) -> PathBuf {
        self.root.join(&self.config.directories.owned)
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.root.join(&self.config.directories.vendor)
    }

    /// Discover owned projects per §4.3/§9 (deterministic order).
    pub fn owned_projects(&self) -> WorkspaceResult<Vec<OwnedProject>> {
        discovery::owned_projects(&self.root, &self.config, &self.project_patterns, &self.ignore_patterns)
    }

    /// Every pulled project (§4.3).
    pub fn received_projects(&self) -> WorkspaceResult<Vec<PulledProject>> {
        let owned = self.owned_projects()?;
        discovery::received_projects(&self.root, &self.config, &owned)
    }

    /// `.proto` files under an owned project's directory, relative to the
    /// project root, with file-level ignore patterns applied.
    pub fn list_owned_project_files(&self, project: &OwnedProject) -> WorkspaceResult<Vec<String>> {
        let dir = self.owned_dir().join(project.local_path.as_str());
        list_proto_files(&dir, Some(&self.ignore_patterns))
    }

    /// `.proto` files under a pulled project's directory (by local path),
    /// relative to the project root.
    pub fn list_vendor_project_files(&self, local_path: &ProjectPath) -> WorkspaceResult<Vec<String>> {
        let dir = self.vendor_dir().join(local_path.as_str());
        list_proto_files(&dir, None)
    }

    /// `service + "/" + local` (§3).
    pub fn registry_path(&self, local: &ProjectPath) -> ProjectPath {
        ProjectPath::parse(format!("{}/{local}", self.config.service))
            .expect("service + validated local path is always a valid project path")
    }

    /// Strip the leading `service + "/"` if present (§3); `None` if
    /// `registry` is not under this workspace's service namespace.
    pub fn local_path(&self, registry: &ProjectPath) -> Option<ProjectPath> {
        registry
            .as_str()
            .strip_prefix(&format!("{}/", self.config.service))
            .and_then(|rest| ProjectPath::parse(rest).ok())
    }

    /// Open a `Receiver` scoped to `project`'s directory under
    /// `vendorDir`.
    pub fn receive(&self, project: &ProjectPath) -> Receiver {
        Receiver::open(self.vendor_dir().join(project.as_str()))
    }

    /// `.proto` files under `ownedDir`/`vendorDir` belonging to no
    /// currently valid project (§4.3).
    pub fn orphaned_files(&self) -> WorkspaceResult<Vec<OrphanFile>> {
        let owned = self.owned_projects()?;
        let pulled = self.received_projects()?;
        orphan::orphaned_files(&self.root, &self.config, &owned, &pulled)
    }
}

fn list_proto_files(dir: &Path, ignore_patterns: Option<&PatternSet>) -> WorkspaceResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_none_or(|ext| ext != "proto") {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        if let Some(patterns) = ignore_patterns
            && patterns.matches(&rel)
        {
            continue;
        }

        files.push(rel);
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_workspace(root: &Path) -> Workspace {
        let config = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories { owned: "proto".into(), vendor: "vendor".into() },
            auto_discover: true,
            projects: vec![],
            ignores: vec![],
        };
        Workspace::init(root, config, false).unwrap()
    }

    #[test]
    fn registry_path_and_local_path_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = init_workspace(tmp.path());
        let local = ProjectPath::parse("api/v1").unwrap();
        let registry = ws.registry_path(&local);
        assert_eq!(registry.as_str(), "payments/api/v1");
        assert_eq!(ws.local_path(&registry), Some(local));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(tmp.path());
        let config = WorkspaceConfig {
            service: "other".into(),
            directories: Directories::default(),
            auto_discover: false,
            projects: vec![],
            ignores: vec![],
        };
        let err = Workspace::init(tmp.path(), config, false).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyInitialized(_)));
    }

    #[test]
    fn init_with_force_merges_over_existing() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(tmp.path());
        let config = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories::default(),
            auto_discover: false,
            projects: vec!["api/**".into()],
            ignores: vec![],
        };
        let ws = Workspace::init(tmp.path(), config, true).unwrap();
        assert_eq!(ws.config().service, "payments");
        assert_eq!(ws.config().projects, vec!["api/**"]);
    }

    #[test]
    fn list_owned_project_files_applies_ignore_patterns() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories { owned: "proto".into(), vendor: "vendor".into() },
            auto_discover: true,
            projects: vec![],
            ignores: vec!["**/draft.proto".into()],
        };
        let ws = Workspace::init(tmp.path(), config, false).unwrap();

        let proj_dir = ws.owned_dir().join("api/v1");
        std::fs::create_dir_all(&proj_dir).unwrap();
        std::fs::write(proj_dir.join("a.proto"), b"a").unwrap();
        std::fs::write(proj_dir.join("draft.proto"), b"b").unwrap();

        let project = OwnedProject { local_path: ProjectPath::parse("api/v1").unwrap() };
        let files = ws.list_owned_project_files(&project).unwrap();
        assert_eq!(files, vec!["a.proto".to_string()]);
    }
}
