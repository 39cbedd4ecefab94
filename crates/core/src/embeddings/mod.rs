//! Embedding engine abstraction (C4): `embed_text(texts) -> [[f32]]`, one
//! vector per input, fixed dimensionality per instance. Adapters never
//! reimplement rate limiting or retry — both are layered on top of the
//! provider call in [`embed_with_bisection`].

mod http_batch;
mod local;
mod mock;
mod openai;

use std::future::Future;

use async_trait::async_trait;
use cognee_common::config::EmbeddingConfig;

pub use http_batch::HttpBatchEmbeddingEngine;
pub use local::LocalEmbeddingEngine;
pub use mock::MockEmbeddingEngine;
pub use openai::OpenAiEmbeddingEngine;

use crate::rate_limit::embedding_rate_limiter;
use crate::retry::{is_rate_limit_error, retry_with_backoff};

/// Contract shared by every embedding provider adapter.
#[async_trait]
pub trait EmbeddingEngine: Send + Sync {
    /// Dimensionality of every vector this instance produces.
    fn get_vector_size(&self) -> u32;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Errors surfaced by an embedding provider call.
#[derive(Debug, thiserror::Error, Clone)]
pub enum EmbeddingError {
    #[error("embedding provider error: {0}")]
    Provider(String),

    #[error("embedding context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: u32, got: usize },
}

impl From<EmbeddingError> for cognee_common::CogneeError {
    fn from(e: EmbeddingError) -> Self {
        cognee_common::CogneeError::EmbeddingException(e.to_string())
    }
}

/// Embed `texts` via `call`, rate-limited and retried, recursively
/// bisecting the batch on a classified context-window-overflow error until
/// each half fits or a single item fails (surfacing [`EmbeddingError::ContextWindowExceeded`]
/// unchanged — a lone item that's still too long can't be split further).
pub async fn embed_with_bisection<F, Fut>(
    retry_config: &cognee_common::config::RetryConfig,
    texts: &[String],
    call: &F,
) -> Result<Vec<Vec<f32>>, EmbeddingError>
where
    F: Fn(Vec<String>) -> Fut + Sync,
    Fut: Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send,
{
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    embedding_rate_limiter().async_wait_if_needed().await;

    let attempt = retry_with_backoff(
        retry_config,
        |e: &EmbeddingError| matches!(e, EmbeddingError::Provider(msg) if is_rate_limit_error(msg)),
        || call(texts.to_vec()),
    )
    .await;

    match attempt {
        Ok(vectors) => Ok(vectors),
        Err(EmbeddingError::ContextWindowExceeded(_)) if texts.len() > 1 => {
            let mid = texts.len() / 2;
            let (left, right) = texts.split_at(mid);
            let mut left_vectors =
                Box::pin(embed_with_bisection(retry_config, left, call)).await?;
            let right_vectors =
                Box::pin(embed_with_bisection(retry_config, right, call)).await?;
            left_vectors.extend(right_vectors);
            Ok(left_vectors)
        }
        Err(other) => Err(other),
    }
}

/// Build the embedding engine configured via the environment (`MOCK_EMBEDDING`
/// short-circuits to the null engine regardless of `EMBEDDING_PROVIDER`).
pub fn build_embedding_engine(config: &EmbeddingConfig) -> Box<dyn EmbeddingEngine> {
    if config.mock {
        return Box::new(MockEmbeddingEngine::new(config.dimensions));
    }

    match config.provider.as_str() {
        "openai" => Box::new(OpenAiEmbeddingEngine::new(config.clone())),
        "http" => Box::new(HttpBatchEmbeddingEngine::new(config.clone())),
        "local" => Box::new(LocalEmbeddingEngine::new(config.clone())),
        other => {
            tracing::warn!(provider = other, "unknown embedding provider, falling back to mock");
            Box::new(MockEmbeddingEngine::new(config.dimensions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retry_config() -> cognee_common::config::RetryConfig {
        cognee_common::config::RetryConfig {
            max_retries: 3,
            base_seconds: 0.001,
            factor: 1.0,
            jitter: 0.0,
        }
    }

    #[tokio::test]
    async fn bisects_on_context_window_overflow_until_single_item_succeeds() {
        let calls = AtomicU32::new(0);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];

        let result = embed_with_bisection(&retry_config(), &texts, &|batch: Vec<String>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if batch.len() > 1 {
                    Err(EmbeddingError::ContextWindowExceeded("too long".into()))
                } else {
                    Ok(vec![vec![1.0_f32]])
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 4);
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn single_item_context_overflow_surfaces_unchanged() {
        let texts = vec!["only one".to_string()];
        let result = embed_with_bisection(&retry_config(), &texts, &|_: Vec<String>| async {
            Err(EmbeddingError::ContextWindowExceeded("still too long".into()))
        })
        .await;

        assert!(matches!(result, Err(EmbeddingError::ContextWindowExceeded(_))));
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let result = embed_with_bisection(&retry_config(), &[], &|_: Vec<String>| async {
            unreachable!("should never be called for an empty batch")
        })
        .await
        .unwrap();
        assert!(result.is_empty());
    }
}
