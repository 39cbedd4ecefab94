//! Cache/Lock coordinator (C7): distributed mutual exclusion, per-session
//! Q&A storage, and append-only usage logging, behind one [`CacheEngine`]
//! trait implemented by a Redis backend (cross-process locking) and an
//! embedded file-backed one (process-local locking only).

pub mod fs;
pub mod redis;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use cognee_common::model::{QAEntry, UsageLogEntry};
use cognee_common::{CogneeError, QaId, Result};

pub use fs::FsCacheEngine;
pub use redis::RedisCacheEngine;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Partial update applied to an existing [`QAEntry`] by
/// [`CacheEngine::update_qa_entry`]. Fields left `None` are left untouched.
#[derive(Clone, Debug, Default)]
pub struct QaUpdate {
    pub answer: Option<String>,
    pub context: Option<String>,
    pub feedback_text: Option<String>,
    pub feedback_score: Option<i32>,
}

/// Contract shared by every cache/lock backend.
#[async_trait]
pub trait CacheEngine: Send + Sync {
    /// Attempt to acquire `key` once, with a server-side auto-expiry of
    /// `ttl`. Returns a caller-opaque token on success (needed to release
    /// only the lock this caller holds), or `None` if already held.
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> Result<Option<String>>;

    /// Idempotent: releasing a lock not held by `token` (including one this
    /// caller no longer holds) is a no-op.
    async fn release_lock(&self, key: &str, token: &str) -> Result<()>;

    async fn create_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry: QAEntry,
        ttl: Duration,
    ) -> Result<()>;

    /// Most recent `last_n` entries, newest first.
    async fn get_latest_qa_entries(
        &self,
        user_id: &str,
        session_id: &str,
        last_n: usize,
    ) -> Result<Vec<QAEntry>>;

    /// Full list in insertion order.
    async fn get_all_qa_entries(&self, user_id: &str, session_id: &str) -> Result<Vec<QAEntry>>;

    /// `false` if `qa_id` isn't present in this session.
    async fn update_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        qa_id: QaId,
        update: QaUpdate,
    ) -> Result<bool>;

    async fn delete_qa_entries(&self, user_id: &str, session_id: &str, qa_id: QaId) -> Result<bool>;

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool>;

    async fn log_usage(&self, user_id: &str, entry: UsageLogEntry, ttl: Duration) -> Result<()>;

    /// Most recent `limit` usage log entries, newest first.
    async fn get_usage_logs(&self, user_id: &str, limit: usize) -> Result<Vec<UsageLogEntry>>;
}

/// A held lock. Releases on `Drop` (best-effort — the failure, if any, is
/// only `tracing::warn!`-logged, matching the spec's "panic-during-held-lock"
/// resolution: a process that aborts rather than unwinds relies on the
/// server-side `timeout` for recovery, not on this guard). Call
/// [`LockGuard::release`] directly when the caller wants to observe release
/// failures or avoid the unwind-time `tokio::spawn`.
pub struct LockGuard {
    engine: Option<Arc<dyn CacheEngine>>,
    key: String,
    token: String,
}

impl LockGuard {
    fn new(engine: Arc<dyn CacheEngine>, key: String, token: String) -> Self {
        Self {
            engine: Some(engine),
            key,
            token,
        }
    }

    /// Release the lock now, awaiting completion. Idempotent: a second call
    /// (or a subsequent `Drop`) observes the lock already released and is a
    /// no-op.
    pub async fn release(mut self) -> Result<()> {
        if let Some(engine) = self.engine.take() {
            engine.release_lock(&self.key, &self.token).await?;
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            let key = self.key.clone();
            let token = self.token.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.release_lock(&key, &token).await {
                    tracing::warn!(error = %e, key = %key, "lock release on drop failed");
                }
            });
        }
    }
}

/// Acquire `key`, polling every 100ms, until a permit opens up or
/// `blocking_timeout` elapses (in which case
/// [`CogneeError::LockAcquisitionTimeout`] is raised). The lock
/// auto-expires server-side after `timeout` to recover from a holder that
/// never releases.
pub async fn acquire_lock(
    engine: Arc<dyn CacheEngine>,
    key: impl Into<String>,
    timeout: Duration,
    blocking_timeout: Duration,
) -> Result<LockGuard> {
    let key = key.into();
    let start = Instant::now();

    loop {
        if let Some(token) = engine.try_acquire_lock(&key, timeout).await? {
            return Ok(LockGuard::new(engine, key, token));
        }

        if start.elapsed() >= blocking_timeout {
            return Err(CogneeError::LockAcquisitionTimeout(blocking_timeout));
        }

        let remaining = blocking_timeout.saturating_sub(start.elapsed());
        tokio::time::sleep(LOCK_POLL_INTERVAL.min(remaining.max(Duration::from_millis(1)))).await;
    }
}

/// Validate a [`QaUpdate`]'s feedback fields before it reaches a backend:
/// `feedback_score`, when present, is an integer in `[0, 5]`.
pub(crate) fn validate_qa_update(update: &QaUpdate) -> Result<()> {
    if let Some(score) = update.feedback_score {
        if !(0..=5).contains(&score) {
            return Err(CogneeError::SessionQAEntryValidationError(format!(
                "feedback_score must be in [0, 5], got {score}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct FakeEngine {
        held: StdMutex<Option<String>>,
    }

    #[async_trait]
    impl CacheEngine for FakeEngine {
        async fn try_acquire_lock(&self, _key: &str, _ttl: Duration) -> Result<Option<String>> {
            let mut held = self.held.lock().unwrap();
            if held.is_some() {
                return Ok(None);
            }
            let token = uuid::Uuid::new_v4().to_string();
            *held = Some(token.clone());
            Ok(Some(token))
        }

        async fn release_lock(&self, _key: &str, token: &str) -> Result<()> {
            let mut held = self.held.lock().unwrap();
            if held.as_deref() == Some(token) {
                *held = None;
            }
            Ok(())
        }

        async fn create_qa_entry(&self, _: &str, _: &str, _: QAEntry, _: Duration) -> Result<()> {
            unimplemented!()
        }
        async fn get_latest_qa_entries(&self, _: &str, _: &str, _: usize) -> Result<Vec<QAEntry>> {
            unimplemented!()
        }
        async fn get_all_qa_entries(&self, _: &str, _: &str) -> Result<Vec<QAEntry>> {
            unimplemented!()
        }
        async fn update_qa_entry(&self, _: &str, _: &str, _: QaId, _: QaUpdate) -> Result<bool> {
            unimplemented!()
        }
        async fn delete_qa_entries(&self, _: &str, _: &str, _: QaId) -> Result<bool> {
            unimplemented!()
        }
        async fn delete_session(&self, _: &str, _: &str) -> Result<bool> {
            unimplemented!()
        }
        async fn log_usage(&self, _: &str, _: UsageLogEntry, _: Duration) -> Result<()> {
            unimplemented!()
        }
        async fn get_usage_logs(&self, _: &str, _: usize) -> Result<Vec<UsageLogEntry>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn second_acquire_times_out_while_first_holds() {
        let engine: Arc<dyn CacheEngine> = Arc::new(FakeEngine {
            held: StdMutex::new(None),
        });

        let guard = acquire_lock(engine.clone(), "k", Duration::from_secs(30), Duration::from_secs(5))
            .await
            .unwrap();

        let err = acquire_lock(engine.clone(), "k", Duration::from_secs(30), Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, CogneeError::LockAcquisitionTimeout(_)));

        guard.release().await.unwrap();
        acquire_lock(engine, "k", Duration::from_secs(30), Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[test]
    fn validate_qa_update_rejects_out_of_range_score() {
        let err = validate_qa_update(&QaUpdate {
            feedback_score: Some(10),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, CogneeError::SessionQAEntryValidationError(_)));
    }

    #[test]
    fn validate_qa_update_accepts_boundary_scores() {
        for score in [0, 5] {
            validate_qa_update(&QaUpdate {
                feedback_score: Some(score),
                ..Default::default()
            })
            .unwrap();
        }
    }
}
