//! Errors surfaced by the registry cache (§4.2, §7).

use thiserror::Error;

use crate::git::GitError;

use super::project::ProjectPath;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project not found: {0}")]
    NotFound(ProjectPath),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("snapshot '{0}' does not exist in the registry cache; try refreshing")]
    UnknownSnapshot(String),

    #[error("project path is invalid: {0}")]
    InvalidProjectPath(#[from] super::project::ProjectPathError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
