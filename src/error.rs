//! The crate's single top-level error type, wrapping each module's own
//! error enum (§7 "Policy": lower layers report, the orchestrator and
//! `cli` classify/surface). `cli` is the only consumer of this type.

use thiserror::Error;

use crate::git::GitError;
use crate::orchestrator::OrchestratorError;
use crate::registry::RegistryError;
use crate::resolver::ResolverError;
use crate::workspace::WorkspaceError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The process exit code this error maps to (§6 "Exit codes"): `130`
    /// for a cancellation, `1` for everything else. `0` (success) is
    /// never produced here — it's the absence of an `Error`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Orchestrator(OrchestratorError::Cancelled) => 130,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
