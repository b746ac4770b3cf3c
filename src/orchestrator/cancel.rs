//! Cooperative cancellation (§5 "Cancellation semantics"): every blocking
//! suspension point named in §5 checks this token and returns `Cancelled`
//! rather than starting new work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::{OrchestratorError, OrchestratorResult};

/// A cheap-to-clone cooperative cancellation flag, tied by the `cli`
/// layer to the process's interrupt signal.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Check the token, returning `Cancelled` if it has fired. Call at
    /// every suspension point (before a fetch/push, before each project
    /// in a sequential chain, before each file write).
    pub fn check(&self) -> OrchestratorResult<()> {
        if self.is_cancelled() {
            Err(OrchestratorError::Cancelled)
        } else {
            Ok(())
        }
    }
}
