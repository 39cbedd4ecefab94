use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cognee_common::model::{DataPoint, ScoredResult};
use cognee_common::{CogneeError, DataPointId, Result};

use crate::embeddings::EmbeddingEngine;

use super::{cosine_distance, rank_candidates, resolve_query_vector, VectorStore};

struct StoredPoint {
    point: DataPoint,
    vector: Vec<f32>,
}

/// In-process `HashMap`-backed cosine ANN. The default/test backend, and
/// the implementation every other adapter's contract test runs against.
pub struct InMemoryVectorStore {
    embedding_engine: Arc<dyn EmbeddingEngine>,
    collections: RwLock<HashMap<String, HashMap<DataPointId, StoredPoint>>>,
}

impl InMemoryVectorStore {
    pub fn new(embedding_engine: Arc<dyn EmbeddingEngine>) -> Self {
        Self {
            embedding_engine,
            collections: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn has_collection(&self, collection_name: &str) -> bool {
        self.collections.read().await.contains_key(collection_name)
    }

    async fn create_collection(&self, collection_name: &str) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection_name.to_string())
            .or_default();
        Ok(())
    }

    async fn create_data_points(&self, collection_name: &str, points: Vec<DataPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = points.iter().map(|p| p.index_text()).collect();
        let vectors = self
            .embedding_engine
            .embed_text(&texts)
            .await
            .map_err(CogneeError::from)?;

        let mut collections = self.collections.write().await;
        let collection = collections.entry(collection_name.to_string()).or_default();
        for (point, vector) in points.into_iter().zip(vectors) {
            collection.insert(point.id.clone(), StoredPoint { point, vector });
        }
        Ok(())
    }

    async fn retrieve(&self, collection_name: &str, ids: &[DataPointId]) -> Result<Vec<ScoredResult>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(collection_name) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection.get(id))
            .map(|stored| ScoredResult {
                id: stored.point.id.clone(),
                payload: stored.point.payload.clone(),
                score: 0.0,
                vector: None,
            })
            .collect())
    }

    async fn search(
        &self,
        collection_name: &str,
        text: Option<&str>,
        vector: Option<Vec<f32>>,
        limit: usize,
        with_vector: bool,
    ) -> Result<Vec<ScoredResult>> {
        let query_vector = resolve_query_vector(&self.embedding_engine, text, vector).await?;

        let collections = self.collections.read().await;
        let Some(collection) = collections.get(collection_name) else {
            tracing::warn!(collection = collection_name, "search against missing collection");
            return Ok(Vec::new());
        };

        let candidates = collection
            .values()
            .map(|stored| {
                let distance = cosine_distance(&query_vector, &stored.vector);
                let returned_vector = with_vector.then(|| stored.vector.clone());
                (
                    stored.point.id.clone(),
                    distance,
                    stored.point.payload.clone(),
                    returned_vector,
                )
            })
            .collect();

        Ok(rank_candidates(candidates, limit))
    }

    async fn batch_search(
        &self,
        collection_name: &str,
        texts: &[String],
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<Vec<ScoredResult>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(
                self.search(collection_name, Some(text), None, limit, with_vectors)
                    .await?,
            );
        }
        Ok(results)
    }

    async fn delete_data_points(&self, collection_name: &str, ids: &[DataPointId]) -> Result<()> {
        if let Some(collection) = self.collections.write().await.get_mut(collection_name) {
            for id in ids {
                collection.remove(id);
            }
        }
        Ok(())
    }

    async fn prune(&self) -> Result<()> {
        self.collections.write().await.clear();
        Ok(())
    }
}
