//! Embedded, file-backed [`CacheEngine`]: an in-process TTL map for locks
//! (no cross-process coordination — a single-writer deployment's substitute
//! for Redis) with every Q&A/usage-log mutation snapshotted to a JSON file
//! on disk. Grounded on the teacher's `fetch::cache::UrlCache` eviction
//! idiom, generalized from one `HashMap<String, CacheEntry>` to the three
//! maps this contract needs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use cognee_common::model::{QAEntry, UsageLogEntry};
use cognee_common::{CogneeError, QaId, Result};

use super::{validate_qa_update, CacheEngine, QaUpdate};

struct LockEntry {
    token: String,
    expires_at: Instant,
}

/// Snapshot of everything persisted to disk. Locks are deliberately absent —
/// a lock held by a process that dies with it should not resurrect on
/// restart.
#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    sessions: HashMap<String, Vec<QAEntry>>,
    usage_logs: HashMap<String, Vec<UsageLogEntry>>,
}

#[derive(Default)]
struct State {
    locks: HashMap<String, LockEntry>,
    snapshot: Snapshot,
}

pub struct FsCacheEngine {
    path: PathBuf,
    state: Mutex<State>,
}

fn session_key(user_id: &str, session_id: &str) -> String {
    format!("{user_id}\u{0}{session_id}")
}

impl FsCacheEngine {
    /// Load `path` if it exists (an empty snapshot otherwise) and keep
    /// rewriting it in full on every mutation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CogneeError::InvalidValueError(format!("corrupt cache snapshot: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(CogneeError::CacheConnectionError(e.to_string())),
        };

        Ok(Self {
            path,
            state: Mutex::new(State {
                locks: HashMap::new(),
                snapshot,
            }),
        })
    }

    async fn persist(&self, state: &State) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&state.snapshot)
            .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
            }
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CacheEngine for FsCacheEngine {
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(existing) = state.locks.get(key) {
            if existing.expires_at > now {
                return Ok(None);
            }
        }

        let token = uuid::Uuid::new_v4().to_string();
        state.locks.insert(
            key.to_string(),
            LockEntry {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(token))
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.locks.get(key).map(|e| e.token.as_str()) == Some(token) {
            state.locks.remove(key);
        }
        Ok(())
    }

    async fn create_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry: QAEntry,
        _ttl: Duration,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .snapshot
            .sessions
            .entry(session_key(user_id, session_id))
            .or_default()
            .push(entry);
        self.persist(&state).await
    }

    async fn get_latest_qa_entries(
        &self,
        user_id: &str,
        session_id: &str,
        last_n: usize,
    ) -> Result<Vec<QAEntry>> {
        let state = self.state.lock().await;
        let mut entries = state
            .snapshot
            .sessions
            .get(&session_key(user_id, session_id))
            .cloned()
            .unwrap_or_default();
        entries.reverse();
        entries.truncate(last_n);
        Ok(entries)
    }

    async fn get_all_qa_entries(&self, user_id: &str, session_id: &str) -> Result<Vec<QAEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .snapshot
            .sessions
            .get(&session_key(user_id, session_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn update_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        qa_id: QaId,
        update: QaUpdate,
    ) -> Result<bool> {
        validate_qa_update(&update)?;
        let mut state = self.state.lock().await;
        let key = session_key(user_id, session_id);
        let Some(entries) = state.snapshot.sessions.get_mut(&key) else {
            return Ok(false);
        };
        let Some(entry) = entries.iter_mut().find(|e| e.qa_id == qa_id) else {
            return Ok(false);
        };

        if let Some(answer) = update.answer {
            entry.answer = answer;
        }
        if let Some(context) = update.context {
            entry.context = context;
        }
        if let Some(feedback_text) = update.feedback_text {
            entry.feedback_text = Some(feedback_text);
        }
        if let Some(feedback_score) = update.feedback_score {
            entry.feedback_score = Some(feedback_score);
        }

        self.persist(&state).await?;
        Ok(true)
    }

    async fn delete_qa_entries(&self, user_id: &str, session_id: &str, qa_id: QaId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let key = session_key(user_id, session_id);
        let Some(entries) = state.snapshot.sessions.get_mut(&key) else {
            return Ok(false);
        };

        let original_len = entries.len();
        entries.retain(|e| e.qa_id != qa_id);
        let removed = entries.len() != original_len;

        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let removed = state
            .snapshot
            .sessions
            .remove(&session_key(user_id, session_id))
            .is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn log_usage(&self, user_id: &str, entry: UsageLogEntry, _ttl: Duration) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .snapshot
            .usage_logs
            .entry(user_id.to_string())
            .or_default()
            .push(entry);
        self.persist(&state).await
    }

    async fn get_usage_logs(&self, user_id: &str, limit: usize) -> Result<Vec<UsageLogEntry>> {
        let state = self.state.lock().await;
        let mut entries = state
            .snapshot
            .usage_logs
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cognee_common::SessionUsageId;
    use serde_json::json;

    fn sample_entry(qa_id: QaId) -> QAEntry {
        QAEntry::new(qa_id, "question", "context", "answer")
    }

    async fn temp_engine() -> (FsCacheEngine, tempfile_path::TempPath) {
        let path = tempfile_path::TempPath::new();
        let engine = FsCacheEngine::open(&path.0).await.unwrap();
        (engine, path)
    }

    /// Minimal scoped-temp-file helper, avoiding a `tempfile` dependency this
    /// module otherwise has no use for.
    mod tempfile_path {
        use std::path::PathBuf;

        pub struct TempPath(pub PathBuf);

        impl TempPath {
            pub fn new() -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("cognee-cache-test-{}.json", uuid::Uuid::new_v4()));
                Self(path)
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[tokio::test]
    async fn lock_blocks_until_released() {
        let (engine, _path) = temp_engine().await;
        let token = engine
            .try_acquire_lock("k", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        assert!(engine
            .try_acquire_lock("k", Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());

        engine.release_lock("k", &token).await.unwrap();
        assert!(engine
            .try_acquire_lock("k", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn expired_lock_can_be_reacquired() {
        let (engine, _path) = temp_engine().await;
        engine
            .try_acquire_lock("k", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine
            .try_acquire_lock("k", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn qa_entries_round_trip_and_persist_across_reopen() {
        let (engine, path) = temp_engine().await;
        let qa_id = QaId::new();
        engine
            .create_qa_entry("u1", "s1", sample_entry(qa_id), Duration::from_secs(3600))
            .await
            .unwrap();

        let reopened = FsCacheEngine::open(&path.0).await.unwrap();
        let entries = reopened.get_all_qa_entries("u1", "s1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].qa_id, qa_id);
    }

    #[tokio::test]
    async fn get_latest_qa_entries_returns_newest_first_bounded_by_n() {
        let (engine, _path) = temp_engine().await;
        for _ in 0..3 {
            engine
                .create_qa_entry("u1", "s1", sample_entry(QaId::new()), Duration::from_secs(3600))
                .await
                .unwrap();
        }
        let all = engine.get_all_qa_entries("u1", "s1").await.unwrap();
        let latest = engine.get_latest_qa_entries("u1", "s1", 2).await.unwrap();

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].qa_id, all[2].qa_id);
        assert_eq!(latest[1].qa_id, all[1].qa_id);
    }

    #[tokio::test]
    async fn update_qa_entry_rejects_invalid_feedback_score() {
        let (engine, _path) = temp_engine().await;
        let qa_id = QaId::new();
        engine
            .create_qa_entry("u1", "s1", sample_entry(qa_id), Duration::from_secs(3600))
            .await
            .unwrap();

        let err = engine
            .update_qa_entry(
                "u1",
                "s1",
                qa_id,
                QaUpdate {
                    feedback_score: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CogneeError::SessionQAEntryValidationError(_)));
    }

    #[tokio::test]
    async fn update_then_delete_qa_entry_reports_presence() {
        let (engine, _path) = temp_engine().await;
        let qa_id = QaId::new();
        engine
            .create_qa_entry("u1", "s1", sample_entry(qa_id), Duration::from_secs(3600))
            .await
            .unwrap();

        let updated = engine
            .update_qa_entry(
                "u1",
                "s1",
                qa_id,
                QaUpdate {
                    answer: Some("revised".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let entries = engine.get_all_qa_entries("u1", "s1").await.unwrap();
        assert_eq!(entries[0].answer, "revised");

        assert!(engine.delete_qa_entries("u1", "s1", qa_id).await.unwrap());
        assert!(!engine.delete_qa_entries("u1", "s1", qa_id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_session_removes_entire_key() {
        let (engine, _path) = temp_engine().await;
        engine
            .create_qa_entry("u1", "s1", sample_entry(QaId::new()), Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(engine.delete_session("u1", "s1").await.unwrap());
        assert!(engine.get_all_qa_entries("u1", "s1").await.unwrap().is_empty());
        assert!(!engine.delete_session("u1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn usage_logs_are_newest_first_and_bounded() {
        let (engine, _path) = temp_engine().await;
        for i in 0..3 {
            let now = Utc::now();
            engine
                .log_usage(
                    "u1",
                    UsageLogEntry {
                        id: SessionUsageId::new(),
                        timestamp: now,
                        kind: "call".to_string(),
                        function_name: format!("fn{i}"),
                        user_id: Some("u1".to_string()),
                        parameters: json!({}),
                        result: json!({}),
                        success: true,
                        error: None,
                        duration_ms: 10,
                        start_time: now,
                        end_time: now,
                        metadata: json!({}),
                    },
                    Duration::from_secs(3600),
                )
                .await
                .unwrap();
        }

        let logs = engine.get_usage_logs("u1", 2).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].function_name, "fn2");
        assert_eq!(logs[1].function_name, "fn1");
    }
}
