//! Git substrate (§4.1): the minimum Git operations the upper layers need,
//! against both non-bare (a producer's own checkout) and bare (the
//! registry mirror) repositories.
//!
//! Isolated behind this module so the registry cache and workspace layers
//! never call `gix` or spawn `git` directly — matching the teacher's split
//! between `RepoHandle`/`operations` and everything built on top of them.

mod error;
mod objects;
mod remote;
mod repo;

pub use error::{GitError, GitResult};
pub use objects::{
    EntryType, Identity, NewTreeEntry, TreeEntry, blob_mode, branch_full_name, commit, read_blob,
    read_blob_bytes, read_tree, tree_mode, update_ref, write_blob, write_tree,
};
pub use remote::{fetch, push_new, push_with_lease};
pub use repo::{OpenOpts, Repo, normalize_remote_url};
