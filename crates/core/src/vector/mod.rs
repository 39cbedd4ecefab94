//! Vector store abstraction (C6): collection lifecycle, point insert, kNN
//! search, batch search, delete, prune. Every adapter delegates embedding
//! to C4 — none re-implement text→vector mapping — and shares the same
//! cosine-distance normalization so results are comparable across
//! backends.

pub mod http;
pub mod memory;
pub mod pgvector;

use std::sync::Arc;

use async_trait::async_trait;

use cognee_common::model::{DataPoint, ScoredResult};
use cognee_common::{CogneeError, Result};

pub use http::HttpVectorStore;
pub use memory::InMemoryVectorStore;
pub use pgvector::PgVectorStore;

use crate::embeddings::EmbeddingEngine;

/// Contract shared by every vector store adapter.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, collection_name: &str) -> bool;

    /// Idempotent: a no-op if the collection already exists.
    async fn create_collection(&self, collection_name: &str) -> Result<()>;

    /// Upsert by id. Embeddings are generated from each point's
    /// `index_fields`-selected text.
    async fn create_data_points(&self, collection_name: &str, points: Vec<DataPoint>) -> Result<()>;

    /// Missing ids are silently dropped. Returned scores are always `0.0`
    /// (no similarity computation — this is a direct fetch by id).
    async fn retrieve(&self, collection_name: &str, ids: &[cognee_common::DataPointId]) -> Result<Vec<ScoredResult>>;

    /// Exactly one of `text`/`vector` must be set. Results ordered by
    /// ascending normalized distance (best match first). Returns an empty
    /// vector (with a warning logged) if the collection doesn't exist,
    /// unless the adapter is strict, in which case it raises
    /// [`CogneeError::CollectionNotFound`].
    async fn search(
        &self,
        collection_name: &str,
        text: Option<&str>,
        vector: Option<Vec<f32>>,
        limit: usize,
        with_vector: bool,
    ) -> Result<Vec<ScoredResult>>;

    /// Same contract as [`VectorStore::search`], one query per text, same
    /// output order as the input texts.
    async fn batch_search(
        &self,
        collection_name: &str,
        texts: &[String],
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<Vec<ScoredResult>>>;

    /// Best-effort; removing an id that doesn't exist is not an error.
    async fn delete_data_points(&self, collection_name: &str, ids: &[cognee_common::DataPointId]) -> Result<()>;

    /// Drops every collection owned by this engine.
    async fn prune(&self) -> Result<()>;
}

/// Embed `text` via the shared engine, enforcing the "exactly one of
/// text/vector" rule adapters share for `search`/`batch_search`.
pub(crate) async fn resolve_query_vector(
    embedding_engine: &Arc<dyn EmbeddingEngine>,
    text: Option<&str>,
    vector: Option<Vec<f32>>,
) -> Result<Vec<f32>> {
    match (text, vector) {
        (Some(_), Some(_)) => Err(CogneeError::MissingQueryParameter(
            "provide either query_text or query_vector, not both".to_string(),
        )),
        (None, None) => Err(CogneeError::MissingQueryParameter(
            "one of query_text or query_vector is required".to_string(),
        )),
        (Some(text), None) => {
            let mut vectors = embedding_engine
                .embed_text(&[text.to_string()])
                .await
                .map_err(CogneeError::from)?;
            Ok(vectors.pop().unwrap_or_default())
        }
        (None, Some(vector)) => Ok(vector),
    }
}

/// Cosine distance in `[0, 2]`: `1 - cosine_similarity`.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

/// Normalize raw cosine distances within one search response to `[0, 1]`
/// (min distance → 0, max → 1; a degenerate all-equal batch collapses to
/// 0 for every candidate) and use that directly as `score` — the closest
/// match scores `0.0`, matching the literal seed scenario in spec §8
/// ("search(\"docs\", \"alpha\") returns the alpha point first with
/// score=0.0"), even though §3 otherwise describes the field as
/// higher-is-better. Sort ascending by distance (equivalently, ascending
/// by score), break ties by ascending id string, and apply `limit` (`0`
/// means unlimited).
pub(crate) fn rank_candidates(
    mut candidates: Vec<(cognee_common::DataPointId, f32, serde_json::Value, Option<Vec<f32>>)>,
    limit: usize,
) -> Vec<ScoredResult> {
    let min = candidates
        .iter()
        .map(|(_, d, _, _)| *d)
        .fold(f32::INFINITY, f32::min);
    let max = candidates
        .iter()
        .map(|(_, d, _, _)| *d)
        .fold(f32::NEG_INFINITY, f32::max);
    let spread = max - min;

    candidates.sort_by(|(id_a, d_a, _, _), (id_b, d_b, _, _)| {
        d_a.partial_cmp(d_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| id_a.to_string().cmp(&id_b.to_string()))
    });

    let results = candidates
        .into_iter()
        .map(|(id, distance, payload, vector)| {
            let normalized = if spread > 0.0 { (distance - min) / spread } else { 0.0 };
            ScoredResult {
                id,
                payload,
                score: normalized,
                vector,
            }
        })
        .collect::<Vec<_>>();

    if limit == 0 {
        results
    } else {
        results.into_iter().take(limit).collect()
    }
}
