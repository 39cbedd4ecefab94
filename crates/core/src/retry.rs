//! Retry/backoff decorator (C2). Wraps any fallible async operation that
//! may fail due to provider throttling, classifying errors by substring
//! match and backing off exponentially with jitter between attempts.
//!
//! Ordering relative to the rate limiter (C1): the rate-limit wait
//! precedes the call; this decorator wraps the outcome. A full call is
//! `wait_if_needed → attempt → on rate-limit error, backoff → retry`.

use std::future::Future;
use std::time::Duration;

use cognee_common::config::RetryConfig;

/// Substrings (case-insensitive) that classify an error as a provider
/// throttling response worth retrying.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "retry after",
    "capacity",
    "quota",
    "limit exceeded",
    "throttled",
    "throttling",
];

/// Whether `message` looks like a provider rate-limit/throttling error.
pub fn is_rate_limit_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Retry `op` with exponential backoff and jitter, classifying failures via
/// `classify`. `classify` receives a reference to the error and returns
/// whether it should be retried; errors that aren't classified as
/// retryable are re-raised immediately. Respects `DISABLE_RETRIES` for
/// deterministic tests — when set, the first failure is re-raised without
/// sleeping or retrying.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    config: &RetryConfig,
    mut classify: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E) -> bool,
{
    let disable_retries = RetryConfig::retries_disabled();
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if disable_retries || attempt >= config.max_retries || !classify(&err) {
                    return Err(err);
                }
                let backoff = backoff_duration(config, attempt);
                tracing::warn!(attempt, wait_ms = backoff.as_millis() as u64, "retrying after classified error");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// `base × factor^attempt × (1 ± jitter)`, with jitter drawn uniformly from
/// `[-jitter, +jitter]` using a cheap time-seeded hash (no external RNG
/// dependency needed for a single scalar per attempt).
fn backoff_duration(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_seconds * config.factor.powi(attempt as i32);
    let jitter_fraction = jitter_sample(attempt) * 2.0 * config.jitter - config.jitter;
    let seconds = (base * (1.0 + jitter_fraction)).max(0.0);
    Duration::from_secs_f64(seconds)
}

/// Deterministic-enough pseudo-random sample in `[0, 1)`, seeded from the
/// attempt number and the current instant, without pulling in `rand`.
fn jitter_sample(attempt: u32) -> f64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    attempt.hash(&mut hasher);
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos()
        .hash(&mut hasher);
    (hasher.finish() % 1_000_000) as f64 / 1_000_000.0
}
