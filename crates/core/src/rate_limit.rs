//! Moving-window rate limiter (C1). Two independent singletons — one for
//! the LLM domain, one for the embedding domain — each tracking a
//! monotonic-clock-ordered list of request timestamps within the last
//! `interval_seconds`.
//!
//! Mirrors `EmbeddingRateLimiter`/the LLM rate limiter in cognee's Python
//! infrastructure layer: `hit_limit()` prunes expired entries and reports
//! whether a new request would exceed the cap; `wait_if_needed()` polls
//! every 500ms until a permit opens up, then records the request.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use cognee_common::config::RateLimitConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A single moving-window rate limiter. Thread-safe: the timestamp list is
/// guarded by a mutex so concurrent callers from the same process observe
/// a consistent window.
pub struct RateLimiter {
    config: RateLimitConfig,
    request_times: Mutex<Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_times: Mutex::new(Vec::new()),
        }
    }

    /// Prune expired entries and report whether a new request would exceed
    /// the configured cap. On the permit path (returning `false`) this
    /// records the request's timestamp, per spec §4.1 ("returns `false`"
    /// implies a recorded request — only a caller that won't actually make
    /// the call should avoid invoking this). When disabled, always returns
    /// `false` without recording anything.
    pub fn hit_limit(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        let cutoff = Instant::now() - Duration::from_secs(self.config.interval_seconds);
        let mut times = self.request_times.lock().unwrap();
        times.retain(|t| *t > cutoff);

        if times.len() >= self.config.requests_limit as usize {
            return true;
        }
        times.push(Instant::now());
        false
    }

    /// Block the calling thread, polling every 500ms, until a permit opens
    /// up. Returns the total time waited. The permitting `hit_limit()` call
    /// itself records the request, so there's nothing left to record here.
    pub fn wait_if_needed(&self) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }

        let start = Instant::now();
        while self.hit_limit() {
            std::thread::sleep(POLL_INTERVAL);
        }
        start.elapsed()
    }

    /// Cooperative async equivalent of [`Self::wait_if_needed`]. Cancelling
    /// the returned future at an await point never records a phantom
    /// request: the only point a timestamp is pushed is inside a completed,
    /// synchronous `hit_limit()` call, never across the `sleep` await.
    pub async fn async_wait_if_needed(&self) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }

        let start = Instant::now();
        while self.hit_limit() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        start.elapsed()
    }
}

/// Process-wide rate limiter singletons for the LLM and embedding domains.
/// The source carries two near-identical embedding rate limiter modules;
/// this crate treats them as one logical component, same as the LLM one.
pub struct RateLimiters {
    pub llm: RateLimiter,
    pub embedding: RateLimiter,
}

static LLM_LIMITER: once_cell::sync::OnceCell<RateLimiter> = once_cell::sync::OnceCell::new();
static EMBEDDING_LIMITER: once_cell::sync::OnceCell<RateLimiter> = once_cell::sync::OnceCell::new();

/// The process-wide LLM-domain rate limiter, built from `LLM_RATE_LIMIT_*`
/// env vars on first use.
pub fn llm_rate_limiter() -> &'static RateLimiter {
    LLM_LIMITER.get_or_init(|| RateLimiter::new(cognee_common::config::llm_config().rate_limit))
}

/// The process-wide embedding-domain rate limiter, built from
/// `EMBEDDING_RATE_LIMIT_*` env vars on first use.
pub fn embedding_rate_limiter() -> &'static RateLimiter {
    EMBEDDING_LIMITER
        .get_or_init(|| RateLimiter::new(cognee_common::config::embedding_config().rate_limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_limiter(requests_limit: u32, interval_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_limit,
            interval_seconds,
        })
    }

    #[test]
    fn disabled_limiter_never_hits() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            requests_limit: 0,
            interval_seconds: 60,
        });
        for _ in 0..100 {
            assert!(!limiter.hit_limit());
        }
    }

    #[test]
    fn caps_at_requests_limit_within_window() {
        // Seed scenario 2 (spec §8): 10 back-to-back `hit_limit` calls —
        // exactly 5 return `false` (allowed, and recorded) and 5 return
        // `true` (denied).
        let limiter = enabled_limiter(5, 10);
        let mut allowed = 0;
        let mut denied = 0;
        for _ in 0..10 {
            if limiter.hit_limit() {
                denied += 1;
            } else {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 5);
        assert_eq!(denied, 5);
    }

    #[test]
    fn window_resets_after_interval_elapses() {
        let limiter = enabled_limiter(2, 0); // zero-width window: always expired immediately
        assert!(!limiter.hit_limit());
        assert!(!limiter.hit_limit());
        // interval_seconds=0 means the cutoff is "now", so every prior
        // request is already outside the window on the next check.
        assert!(!limiter.hit_limit());
    }

    #[tokio::test]
    async fn async_wait_returns_immediately_when_under_cap() {
        let limiter = enabled_limiter(5, 60);
        let waited = limiter.async_wait_if_needed().await;
        assert!(waited < Duration::from_millis(100));
    }
}
