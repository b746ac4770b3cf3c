//! Errors surfaced by the workspace model (§4.3, §7).

use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;

use crate::registry::{ProjectPath, ProjectPathError};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("'{0}' has not been initialized (no protato.yaml); run `protato init` first")]
    NotInitialized(PathBuf),

    #[error("'{0}' is already initialized; pass --force to overwrite")]
    AlreadyInitialized(PathBuf),

    #[error(transparent)]
    InvalidProjectPath(#[from] ProjectPathError),

    #[error("pulling '{project}' would delete '{path}' locally; re-run with --force to allow it")]
    DeletionWouldOccur { project: ProjectPath, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid workspace config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
