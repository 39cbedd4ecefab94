//! Redis-backed [`CacheEngine`]: native lists for Q&A/usage-log storage,
//! `SET ... NX PX` plus a compare-and-delete Lua script for locks. The only
//! backend that supports cross-process locking, per the distilled spec.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use cognee_common::model::{QAEntry, UsageLogEntry};
use cognee_common::{CogneeError, QaId, Result};

use super::{validate_qa_update, CacheEngine, QaUpdate};

const SESSION_ROOT: &str = "qa_session";
const LOG_KEY: &str = "usage_log";

const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

pub struct RedisCacheEngine {
    conn: MultiplexedConnection,
}

impl RedisCacheEngine {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let url = format!("redis://{host}:{port}");
        tracing::info!(url = %url, "connecting to Redis cache backend");
        let client =
            redis::Client::open(url).map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    fn session_key(user_id: &str, session_id: &str) -> String {
        format!("{SESSION_ROOT}:{user_id}:{session_id}")
    }

    fn log_key(user_id: &str) -> String {
        format!("{LOG_KEY}:{user_id}")
    }

    async fn read_entries(&self, key: &str) -> Result<Vec<QAEntry>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(key, 0, -1)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(raw
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect())
    }

    /// Rewrite `key`'s full entry list atomically, preserving whatever TTL
    /// the key already had (a key recreated via `DEL`+`RPUSH` loses its
    /// expiry otherwise).
    async fn rewrite_entries(&self, key: &str, entries: &[QAEntry]) -> Result<()> {
        let mut conn = self.conn.clone();
        let ttl_seconds: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(key);
        for entry in entries {
            let serialized = serde_json::to_string(entry)
                .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
            pipe.rpush(key, serialized);
        }
        if ttl_seconds > 0 {
            pipe.expire(key, ttl_seconds);
        }

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CacheEngine for RedisCacheEngine {
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> Result<Option<String>> {
        let token = uuid::Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        Ok(result.map(|_| token))
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let script = redis::Script::new(RELEASE_SCRIPT);
        script
            .key(key)
            .arg(token)
            .invoke_async::<i64>(&mut conn)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn create_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry: QAEntry,
        ttl: Duration,
    ) -> Result<()> {
        let key = Self::session_key(user_id, session_id);
        let serialized = serde_json::to_string(&entry)
            .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .rpush(&key, serialized)
            .expire(&key, ttl.as_secs() as i64)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn get_latest_qa_entries(
        &self,
        user_id: &str,
        session_id: &str,
        last_n: usize,
    ) -> Result<Vec<QAEntry>> {
        let key = Self::session_key(user_id, session_id);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(&key, -(last_n as isize), -1)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut entries: Vec<QAEntry> = raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect();
        entries.reverse();
        Ok(entries)
    }

    async fn get_all_qa_entries(&self, user_id: &str, session_id: &str) -> Result<Vec<QAEntry>> {
        self.read_entries(&Self::session_key(user_id, session_id)).await
    }

    async fn update_qa_entry(
        &self,
        user_id: &str,
        session_id: &str,
        qa_id: QaId,
        update: QaUpdate,
    ) -> Result<bool> {
        validate_qa_update(&update)?;
        let key = Self::session_key(user_id, session_id);
        let mut entries = self.read_entries(&key).await?;

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

        self.rewrite_entries(&key, &entries).await?;
        Ok(true)
    }

    async fn delete_qa_entries(&self, user_id: &str, session_id: &str, qa_id: QaId) -> Result<bool> {
        let key = Self::session_key(user_id, session_id);
        let entries = self.read_entries(&key).await?;
        let original_len = entries.len();
        let remaining: Vec<QAEntry> = entries.into_iter().filter(|e| e.qa_id != qa_id).collect();

        if remaining.len() == original_len {
            return Ok(false);
        }
        self.rewrite_entries(&key, &remaining).await?;
        Ok(true)
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let key = Self::session_key(user_id, session_id);
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(&key)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn log_usage(&self, user_id: &str, entry: UsageLogEntry, ttl: Duration) -> Result<()> {
        let key = Self::log_key(user_id);
        let serialized = serde_json::to_string(&entry)
            .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .rpush(&key, serialized)
            .expire(&key, ttl.as_secs() as i64)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn get_usage_logs(&self, user_id: &str, limit: usize) -> Result<Vec<UsageLogEntry>> {
        let key = Self::log_key(user_id);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(&key, -(limit as isize), -1)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut entries: Vec<UsageLogEntry> =
            raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect();
        entries.reverse();
        Ok(entries)
    }
}
