//! Session manager (C8): a thin domain layer over the cache coordinator
//! (C7) — default-session resolution, input validation, and the
//! prompt-ready history formatting the retriever core (C9) injects ahead
//! of a new question. Grounded on the teacher's "optional collaborator,
//! no-op when absent" shape used throughout `crates/engine` for
//! best-effort integrations.

use std::sync::Arc;
use std::time::Duration;

use cognee_common::model::QAEntry;
use cognee_common::{CogneeError, QaId, Result};

use crate::cache::{CacheEngine, QaUpdate};

const DEFAULT_SESSION_ID: &str = "default_session";
const DEFAULT_QA_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Domain API a retriever calls into for conversation-history persistence.
/// When constructed with `cache: None`, every write is a no-op and every
/// read returns empty — callers never need to branch on whether caching is
/// configured.
pub struct SessionManager {
    cache: Option<Arc<dyn CacheEngine>>,
    qa_ttl: Duration,
}

impl SessionManager {
    pub fn new(cache: Option<Arc<dyn CacheEngine>>) -> Self {
        Self {
            cache,
            qa_ttl: DEFAULT_QA_TTL,
        }
    }

    pub fn with_qa_ttl(mut self, qa_ttl: Duration) -> Self {
        self.qa_ttl = qa_ttl;
        self
    }

    pub fn is_available(&self) -> bool {
        self.cache.is_some()
    }

    fn validate(user_id: &str, session_id: Option<&str>, last_n: Option<usize>) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(CogneeError::SessionParameterValidationError(
                "user_id must not be empty".to_string(),
            ));
        }
        if let Some(session_id) = session_id {
            if session_id.trim().is_empty() {
                return Err(CogneeError::SessionParameterValidationError(
                    "session_id must not be empty".to_string(),
                ));
            }
        }
        if let Some(last_n) = last_n {
            if last_n == 0 {
                return Err(CogneeError::SessionParameterValidationError(
                    "last_n must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn resolve_session_id(session_id: Option<&str>) -> String {
        session_id
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
    }

    /// Record a question/answer turn. A no-op returning `None` when no
    /// cache is configured.
    pub async fn record_qa(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        question: impl Into<String>,
        context: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<Option<QaId>> {
        Self::validate(user_id, session_id, None)?;
        let Some(cache) = &self.cache else {
            return Ok(None);
        };

        let session_id = Self::resolve_session_id(session_id);
        let qa_id = QaId::new();
        let entry = QAEntry::new(qa_id, question, context, answer);

        match cache.create_qa_entry(user_id, &session_id, entry, self.qa_ttl).await {
            Ok(()) => Ok(Some(qa_id)),
            Err(e) => {
                tracing::warn!(error = %e, user_id, session_id, "session write failed, continuing without cache");
                Ok(None)
            }
        }
    }

    /// Most recent `last_n` entries, newest first. Empty when no cache is
    /// configured or the backend errors — a missing history should never
    /// fail an otherwise-answerable query.
    pub async fn latest_entries(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        last_n: usize,
    ) -> Result<Vec<QAEntry>> {
        Self::validate(user_id, session_id, Some(last_n))?;
        let Some(cache) = &self.cache else {
            return Ok(Vec::new());
        };

        let session_id = Self::resolve_session_id(session_id);
        match cache.get_latest_qa_entries(user_id, &session_id, last_n).await {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(error = %e, user_id, session_id, "session read failed, continuing without history");
                Ok(Vec::new())
            }
        }
    }

    pub async fn all_entries(&self, user_id: &str, session_id: Option<&str>) -> Result<Vec<QAEntry>> {
        Self::validate(user_id, session_id, None)?;
        let Some(cache) = &self.cache else {
            return Ok(Vec::new());
        };
        let session_id = Self::resolve_session_id(session_id);
        cache.get_all_qa_entries(user_id, &session_id).await
    }

    pub async fn update_entry(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        qa_id: QaId,
        update: QaUpdate,
    ) -> Result<bool> {
        Self::validate(user_id, session_id, None)?;
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let session_id = Self::resolve_session_id(session_id);
        cache.update_qa_entry(user_id, &session_id, qa_id, update).await
    }

    pub async fn delete_entry(&self, user_id: &str, session_id: Option<&str>, qa_id: QaId) -> Result<bool> {
        Self::validate(user_id, session_id, None)?;
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let session_id = Self::resolve_session_id(session_id);
        cache.delete_qa_entries(user_id, &session_id, qa_id).await
    }

    pub async fn delete_session(&self, user_id: &str, session_id: Option<&str>) -> Result<bool> {
        Self::validate(user_id, session_id, None)?;
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let session_id = Self::resolve_session_id(session_id);
        cache.delete_session(user_id, &session_id).await
    }

    /// Render `entries` (oldest first) into the prompt-ready block the
    /// retriever core prepends ahead of a new question. Empty history
    /// renders as an empty string.
    pub fn format_history_block(entries: &[QAEntry]) -> String {
        if entries.is_empty() {
            return String::new();
        }

        let mut block = String::from("Previous conversation:\n\n");
        for entry in entries {
            block.push_str(&format!(
                "[{}]\nQUESTION: {}\nCONTEXT: {}\nANSWER: {}\n\n",
                entry.time.to_rfc3339(),
                entry.question,
                entry.context,
                entry.answer,
            ));
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FsCacheEngine;

    async fn temp_manager() -> (SessionManager, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("cognee-session-test-{}.json", uuid::Uuid::new_v4()));
        let engine = FsCacheEngine::open(&path).await.unwrap();
        (SessionManager::new(Some(Arc::new(engine))), path)
    }

    #[tokio::test]
    async fn unavailable_manager_is_a_no_op() {
        let manager = SessionManager::new(None);
        assert!(!manager.is_available());
        assert_eq!(manager.record_qa("u1", None, "q", "c", "a").await.unwrap(), None);
        assert!(manager.latest_entries("u1", None, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_and_read_round_trip_under_default_session() {
        let (manager, path) = temp_manager().await;
        let qa_id = manager
            .record_qa("u1", None, "what is rust?", "ctx", "a systems language")
            .await
            .unwrap()
            .unwrap();

        let entries = manager.latest_entries("u1", None, 5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].qa_id, qa_id);
        assert_eq!(entries[0].answer, "a systems language");

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn rejects_empty_user_id() {
        let (manager, path) = temp_manager().await;
        let err = manager.record_qa("", None, "q", "c", "a").await.unwrap_err();
        assert!(matches!(err, CogneeError::SessionParameterValidationError(_)));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn rejects_zero_last_n() {
        let (manager, path) = temp_manager().await;
        let err = manager.latest_entries("u1", None, 0).await.unwrap_err();
        assert!(matches!(err, CogneeError::SessionParameterValidationError(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn format_history_block_is_empty_for_no_entries() {
        assert_eq!(SessionManager::format_history_block(&[]), "");
    }

    #[test]
    fn format_history_block_renders_each_turn() {
        let qa_id = QaId::new();
        let entry = QAEntry::new(qa_id, "q1", "c1", "a1");
        let block = SessionManager::format_history_block(std::slice::from_ref(&entry));
        assert!(block.starts_with("Previous conversation:\n\n"));
        assert!(block.contains("QUESTION: q1"));
        assert!(block.contains("CONTEXT: c1"));
        assert!(block.contains("ANSWER: a1"));
    }
}
