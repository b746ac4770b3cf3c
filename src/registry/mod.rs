//! The registry cache and its data model (§3, §4.2).
//!
//! A registry is a single Git repository holding one project per
//! directory under `protos/`, each carrying a `protato.root.yaml`
//! metadata file recording the source repository that last published it.
//! This module mirrors that repository locally as a bare clone
//! (`RegistryCache`) and provides the pure algorithms built on top of a
//! snapshot: enumeration, lookup, claim-checking, and staging updates.

mod cache;
mod error;
mod ownership;
mod project;
mod staging;

pub use cache::{ProjectFile, PublishIdentity, RegistryCache, slug};
pub use error::{RegistryError, RegistryResult};
pub use ownership::{ClaimResult, check_project_claim};
pub use project::{
    GitMetadata, METADATA_FILE, PROJECT_COMMIT_MESSAGE_VERB, PROTOS_ROOT, Project, ProjectMetadata,
    ProjectPath, ProjectPathError, any_overlap,
};
