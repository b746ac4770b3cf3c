//! The push/pull/verify/list orchestrator (§4.5): sequences the lower
//! layers, owns retry/backoff and cooperative cancellation, and is the
//! only layer that decides retry vs. abort (§7 "Policy").

mod cancel;
mod error;
mod list;
mod pull;
mod push;
mod retry;
mod validate;
mod verify;

pub use cancel::CancellationToken;
pub use error::{OrchestratorError, OrchestratorResult};
pub use list::{LocalProjectEntry, LocalProjectKind, local_projects, mine_files, mine_projects, registry_projects, short_hash};
pub use pull::{PullOutcome, pull};
pub use push::{PushOutcome, push};
pub use retry::RetryPolicy;
pub use verify::{FileDiff, FileVerdict, OwnershipConflict, VerifyReport, verify};
