//! Environment variable plumbing and the default cache directory (§6).
//!
//! Thin by design (§1): this module only reads `PROTATO_*` and computes a
//! default cache root. CLI flags always take precedence over the
//! corresponding environment variable; that precedence is enforced by
//! `clap`'s `env` attribute in `cli`, not here — this module exists so
//! there is something concrete for `cli` to fall back to, and so the
//! defaults are testable independent of argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use crate::orchestrator::RetryPolicy;

pub const ENV_REGISTRY_URL: &str = "PROTATO_REGISTRY_URL";
pub const ENV_REGISTRY_CACHE: &str = "PROTATO_REGISTRY_CACHE";
pub const ENV_VERBOSITY: &str = "PROTATO_VERBOSITY";
pub const ENV_PUSH_RETRIES: &str = "PROTATO_PUSH_RETRIES";
pub const ENV_PUSH_RETRY_DELAY: &str = "PROTATO_PUSH_RETRY_DELAY";

/// The registry branch all registry operations track. Not currently
/// configurable via environment or flag (§6 lists no variable for it);
/// hard-coded the way a single-branch registry layout (§3) implies.
pub const DEFAULT_BRANCH: &str = "main";

/// OS-conventional default cache root: `<user cache dir>/protato/registry`
/// (§6 "Caches"), overridable by `PROTATO_REGISTRY_CACHE` or `--cache-dir`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("protato")
        .join("registry")
}

/// Read `PROTATO_PUSH_RETRIES`/`PROTATO_PUSH_RETRY_DELAY` into a
/// `RetryPolicy`, falling back to `RetryPolicy::default()` for anything
/// unset or unparseable.
pub fn retry_policy_from_env() -> RetryPolicy {
    let default = RetryPolicy::default();

    let max_attempts = std::env::var(ENV_PUSH_RETRIES)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default.max_attempts);

    let base_delay = std::env::var(ENV_PUSH_RETRY_DELAY)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default.base_delay);

    RetryPolicy { max_attempts, base_delay }
}

/// Verbosity level derived from `PROTATO_VERBOSITY` (an integer, same
/// scale as repeated `-v` flags) when no `-v` flags were given.
pub fn verbosity_from_env() -> u8 {
    std::env::var(ENV_VERBOSITY)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

pub fn registry_url_from_env() -> Option<String> {
    std::env::var(ENV_REGISTRY_URL).ok()
}

pub fn cache_dir_from_env() -> Option<PathBuf> {
    std::env::var_os(ENV_REGISTRY_CACHE).map(PathBuf::from)
}
