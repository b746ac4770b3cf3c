//! Errors surfaced by the import resolver (§4.4, §7).

use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type ResolverResult<T> = Result<T, ResolverError>;
