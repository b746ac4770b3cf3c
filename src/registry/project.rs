//! Project paths and the registry's view of a project (§3).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed name of the per-project metadata file. Its presence at a
/// directory defines that directory as a project root (§3, §4.2).
pub const METADATA_FILE: &str = "protato.root.yaml";

/// The root directory all registry projects live under.
pub const PROTOS_ROOT: &str = "protos";

/// Verb used in the deterministic commit message `setProject` produces
/// (§4.2 "Staging": `"update <path>"`).
pub const PROJECT_COMMIT_MESSAGE_VERB: &str = "update";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectPathError {
    #[error("project path must not be empty")]
    Empty,
    #[error("project path must not start or end with '/'")]
    LeadingOrTrailingSlash,
    #[error("project path must not contain '\\'")]
    Backslash,
    #[error("project path must not contain empty segments ('//')")]
    EmptySegment,
    #[error("project path must not contain '.' or '..' segments")]
    DotSegment,
}

/// A forward-slash-delimited path of one or more non-empty segments, with
/// no leading/trailing slash, no backslashes, and no path-traversal
/// components (§3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectPath(String);

impl ProjectPath {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ProjectPathError> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// `true` if `self` and `other`, with a trailing slash appended, are
    /// prefixes of one another (§3's overlap rule). A path never overlaps
    /// itself under this definition being used for *nesting* checks
    /// elsewhere — use `==` for identity.
    pub fn overlaps(&self, other: &ProjectPath) -> bool {
        if self == other {
            return true;
        }
        let a = format!("{}/", self.0);
        let b = format!("{}/", other.0);
        b.starts_with(&a) || a.starts_with(&b)
    }

    /// `true` if `self` is a strict ancestor of `other` (i.e. `other`
    /// lives under `self/`).
    pub fn is_strict_ancestor_of(&self, other: &ProjectPath) -> bool {
        self != other && other.0.starts_with(&format!("{}/", self.0))
    }

    /// The full registry-relative path to this project's metadata file.
    pub fn metadata_path(&self) -> String {
        format!("{PROTOS_ROOT}/{}/{METADATA_FILE}", self.0)
    }

    /// The registry-relative directory this project's files live under.
    pub fn registry_dir(&self) -> String {
        format!("{PROTOS_ROOT}/{}", self.0)
    }
}

impl std::fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectPath {
    type Error = ProjectPathError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProjectPath> for String {
    fn from(value: ProjectPath) -> Self {
        value.0
    }
}

fn validate(raw: &str) -> Result<(), ProjectPathError> {
    if raw.is_empty() {
        return Err(ProjectPathError::Empty);
    }
    if raw.starts_with('/') || raw.ends_with('/') {
        return Err(ProjectPathError::LeadingOrTrailingSlash);
    }
    if raw.contains('\\') {
        return Err(ProjectPathError::Backslash);
    }
    for segment in raw.split('/') {
        if segment.is_empty() {
            return Err(ProjectPathError::EmptySegment);
        }
        if segment == "." || segment == ".." {
            return Err(ProjectPathError::DotSegment);
        }
    }
    Ok(())
}

/// `true` iff any two paths in `paths` overlap (§3). Used on push to
/// reject a batch of owned projects that would nest one inside another.
pub fn any_overlap(paths: &[ProjectPath]) -> Option<(ProjectPath, ProjectPath)> {
    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            if paths[i].overlaps(&paths[j]) {
                return Some((paths[i].clone(), paths[j].clone()));
            }
        }
    }
    None
}

/// The registry's view of a project: where it lives, and who last
/// published it (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub path: ProjectPath,
    pub source_commit: String,
    pub source_repo_url: String,
}

/// On-disk shape of `protato.root.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub git: GitMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitMetadata {
    pub commit: String,
    pub url: String,
}

impl ProjectMetadata {
    pub fn new(commit: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            git: GitMetadata {
                commit: commit.into(),
                url: url.into(),
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}
