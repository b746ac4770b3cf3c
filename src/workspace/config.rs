//! Workspace configuration: `protato.yaml` (§6).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{WorkspaceError, WorkspaceResult};

pub const CONFIG_FILE: &str = "protato.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directories {
    #[serde(default = "default_owned_dir")]
    pub owned: String,
    #[serde(default = "default_vendor_dir")]
    pub vendor: String,
}

fn default_owned_dir() -> String {
    "proto".to_string()
}

fn default_vendor_dir() -> String {
    "vendor".to_string()
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            owned: default_owned_dir(),
            vendor: default_vendor_dir(),
        }
    }
}

/// `(service, ownedDir, vendorDir, autoDiscover, projectPatterns,
/// ignorePatterns)` from §3. Unknown top-level keys are ignored (no
/// `deny_unknown_fields`), and fields added after a document was written
/// default rather than fail to parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub service: String,
    #[serde(default)]
    pub directories: Directories,
    #[serde(default, rename = "auto_discover")]
    pub auto_discover: bool,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

impl WorkspaceConfig {
    pub fn to_yaml(&self) -> WorkspaceResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(raw: &str) -> WorkspaceResult<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Deep-merge `other` over `self`: scalars overwrite, pattern lists
    /// union-dedupe, `autoDiscover` replaces (§4.3 `init` with `force`).
    pub fn merge_over(&self, other: &WorkspaceConfig) -> WorkspaceConfig {
        let mut projects = self.projects.clone();
        for p in &other.projects {
            if !projects.contains(p) {
                projects.push(p.clone());
            }
        }
        let mut ignores = self.ignores.clone();
        for p in &other.ignores {
            if !ignores.contains(p) {
                ignores.push(p.clone());
            }
        }

        WorkspaceConfig {
            service: other.service.clone(),
            directories: other.directories.clone(),
            auto_discover: other.auto_discover,
            projects,
            ignores,
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn load(root: &Path) -> WorkspaceResult<WorkspaceConfig> {
    let path = config_path(root);
    if !path.is_file() {
        return Err(WorkspaceError::NotInitialized(root.to_path_buf()));
    }
    let raw = std::fs::read_to_string(&path)?;
    WorkspaceConfig::from_yaml(&raw)
}

/// Write `config` at `root`, refusing to overwrite an existing one unless
/// `force`, in which case the new config is deep-merged over the old one.
pub fn save(root: &Path, config: &WorkspaceConfig, force: bool) -> WorkspaceResult<WorkspaceConfig> {
    let path = config_path(root);
    let final_config = if path.is_file() {
        if !force {
            return Err(WorkspaceError::AlreadyInitialized(root.to_path_buf()));
        }
        let existing = WorkspaceConfig::from_yaml(&std::fs::read_to_string(&path)?)?;
        existing.merge_over(config)
    } else {
        config.clone()
    };

    std::fs::create_dir_all(root)?;
    std::fs::write(&path, final_config.to_yaml()?)?;
    std::fs::create_dir_all(root.join(&final_config.directories.owned))?;
    std::fs::create_dir_all(root.join(&final_config.directories.vendor))?;

    Ok(final_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directories_are_proto_and_vendor() {
        let d = Directories::default();
        assert_eq!(d.owned, "proto");
        assert_eq!(d.vendor, "vendor");
    }

    #[test]
    fn merge_over_unions_pattern_lists_without_duplicating() {
        let base = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories::default(),
            auto_discover: false,
            projects: vec!["api/*".into()],
            ignores: vec![],
        };
        let incoming = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories::default(),
            auto_discover: true,
            projects: vec!["api/*".into(), "internal/*".into()],
            ignores: vec!["**/draft/**".into()],
        };

        let merged = base.merge_over(&incoming);
        assert_eq!(merged.projects, vec!["api/*", "internal/*"]);
        assert_eq!(merged.ignores, vec!["**/draft/**"]);
        assert!(merged.auto_discover);
    }

    #[test]
    fn roundtrips_through_yaml() {
        let config = WorkspaceConfig {
            service: "payments".into(),
            directories: Directories::default(),
            auto_discover: true,
            projects: vec!["**".into()],
            ignores: vec![],
        };
        let yaml = config.to_yaml().unwrap();
        let parsed = WorkspaceConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
