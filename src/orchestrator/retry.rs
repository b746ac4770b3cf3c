//! Retry-with-backoff policy (§4.5, §5, §7): the orchestrator is the
//! only layer that decides retry vs. abort; lower layers just classify
//! and report.

use std::time::Duration;

use crate::git::GitError;
use crate::registry::RegistryError;

use super::cancel::CancellationToken;
use super::error::{OrchestratorError, OrchestratorResult};

/// `(maxAttempts, baseDelay)` — defaults match §4.5's "configurable max
/// attempts, e.g., 5" and §5's `baseDelay * attempt` linear backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Whether a `GitError` should be retried by the orchestrator, or is
/// immediately fatal (§4.2 "Failure semantics", §7).
pub fn is_retryable(error: &GitError) -> bool {
    matches!(
        error,
        GitError::StaleParent { .. } | GitError::NetworkError(_) | GitError::AuthError(_)
    )
}

/// Whether a full pipeline attempt's error is retryable: a `GitError`
/// reaching the orchestrator directly, or wrapped one level in a
/// `RegistryError` (every `RegistryCache` operation's `refresh`/`push`
/// failure arrives this way). Everything else — claim conflicts,
/// validation errors, cancellation — is immediately fatal.
fn is_retryable_outcome(error: &OrchestratorError) -> bool {
    match error {
        OrchestratorError::Git(e) => is_retryable(e),
        OrchestratorError::Registry(RegistryError::Git(e)) => is_retryable(e),
        _ => false,
    }
}

/// Run `attempt` up to `policy.max_attempts` times, sleeping
/// `base_delay * attempt_number` between attempts whose error is
/// retryable per `is_retryable_outcome`. The first non-retryable error,
/// or exhaustion of attempts, aborts — the latter with
/// `RetriesExhausted`.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> OrchestratorResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = OrchestratorResult<T>>,
{
    let mut last_error = String::new();
    for attempt_number in 1..=policy.max_attempts {
        cancel.check()?;

        match attempt(attempt_number).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !is_retryable_outcome(&error) {
                    return Err(error);
                }
                last_error = error.to_string();
                if attempt_number < policy.max_attempts {
                    let delay = policy.base_delay * attempt_number;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(OrchestratorError::RetriesExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}
