//! Error types for the Git substrate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the Git substrate (§4.1).
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("unknown object: {0}")]
    UnknownObject(String),

    #[error("push rejected: remote ref moved since refresh (expected {expected}, remote is {actual})")]
    StaleParent { expected: String, actual: String },

    #[error("network error talking to remote: {0}")]
    NetworkError(String),

    #[error("authentication error talking to remote: {0}")]
    AuthError(String),

    #[error("no git identity configured (user.name/user.email)")]
    UnknownIdentity,

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Gix(Box<dyn std::error::Error + Send + Sync>),

    #[error("git command failed: {0}")]
    GitCommand(String),
}

impl From<gix::open::Error> for GitError {
    fn from(e: gix::open::Error) -> Self {
        GitError::Gix(Box::new(e))
    }
}

impl From<gix::discover::Error> for GitError {
    fn from(e: gix::discover::Error) -> Self {
        GitError::Gix(Box::new(e))
    }
}

impl From<gix::init::Error> for GitError {
    fn from(e: gix::init::Error) -> Self {
        GitError::Gix(Box::new(e))
    }
}

impl From<gix::clone::Error> for GitError {
    fn from(e: gix::clone::Error) -> Self {
        GitError::Gix(Box::new(e))
    }
}

impl From<gix::revision::spec::parse::Error> for GitError {
    fn from(e: gix::revision::spec::parse::Error) -> Self {
        GitError::UnknownRevision(e.to_string())
    }
}

pub type GitResult<T> = Result<T, GitError>;
