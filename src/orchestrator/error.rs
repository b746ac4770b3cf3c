//! Errors surfaced by the push/pull/verify/list pipelines (§4.5, §7).

use thiserror::Error;

use crate::git::GitError;
use crate::registry::{ProjectPath, RegistryError};
use crate::resolver::ResolverError;
use crate::workspace::WorkspaceError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("'{path}' is already owned by '{owner}'")]
    ConflictOwner { path: ProjectPath, owner: String },

    #[error("'{a}' and '{b}' overlap: a project path cannot nest under another")]
    ProjectsOverlap { a: ProjectPath, b: ProjectPath },

    #[error("'{path}' conflicts with existing project '{parent}', owned by '{owner}'")]
    ConflictParent { path: ProjectPath, parent: ProjectPath, owner: String },

    #[error("'{path}' conflicts with existing sub-project(s): {}", .children.join(", "))]
    ConflictChildren { path: ProjectPath, children: Vec<String> },

    #[error("proto validation failed for '{project}': {reason}")]
    ValidationError { project: ProjectPath, reason: String },

    #[error("pulling '{project}' would delete {} file(s), starting with '{first}'; re-run with --force", .paths.len())]
    DeletionWouldOccur { project: ProjectPath, first: String, paths: Vec<String> },

    #[error("no projects to pull: no arguments given and no project previously pulled")]
    NothingToPull,

    #[error("push aborted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("operation was cancelled")]
    Cancelled,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
