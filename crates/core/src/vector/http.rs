//! Remote HTTP vector service adapter: batched upsert/search against a
//! vendor-neutral JSON wire format, demonstrating the "remote HTTP endpoint
//! with batching" archetype without committing to one vendor's API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cognee_common::model::{DataPoint, ScoredResult};
use cognee_common::{CogneeError, DataPointId, Result};

use crate::embeddings::EmbeddingEngine;

use super::{rank_candidates, resolve_query_vector, VectorStore};

pub struct HttpVectorStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    embedding_engine: Arc<dyn EmbeddingEngine>,
}

impl HttpVectorStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, embedding_engine: Arc<dyn EmbeddingEngine>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            embedding_engine,
        }
    }

    fn collection_url(&self, collection_name: &str, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url.trim_end_matches('/'), collection_name, suffix)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[derive(Serialize)]
struct UpsertPoint<'a> {
    id: Uuid,
    payload: &'a serde_json::Value,
    vector: &'a [f32],
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: Vec<UpsertPoint<'a>>,
}

#[derive(Serialize)]
struct RetrieveRequest {
    ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct RemotePoint {
    id: Uuid,
    payload: serde_json::Value,
}

#[derive(Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_vector: bool,
}

#[derive(Deserialize)]
struct RemoteScoredPoint {
    id: Uuid,
    payload: serde_json::Value,
    distance: f32,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

#[derive(Serialize)]
struct DeleteRequest {
    ids: Vec<Uuid>,
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn has_collection(&self, collection_name: &str) -> bool {
        self.request(reqwest::Method::GET, &self.collection_url(collection_name, ""))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn create_collection(&self, collection_name: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, &self.collection_url(collection_name, ""))
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::CONFLICT {
            return Err(CogneeError::CacheConnectionError(format!(
                "create_collection failed: {}",
                response.status()
            )));
        }
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

        let upsert_points: Vec<UpsertPoint> = points
            .iter()
            .zip(vectors.iter())
            .map(|(point, vector)| UpsertPoint {
                id: point.id.into(),
                payload: &point.payload,
                vector,
            })
            .collect();

        let response = self
            .request(reqwest::Method::POST, &self.collection_url(collection_name, "/points"))
            .json(&UpsertRequest { points: upsert_points })
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CogneeError::CollectionNotFound(collection_name.to_string()));
        }
        if !response.status().is_success() {
            return Err(CogneeError::CacheConnectionError(format!(
                "create_data_points failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn retrieve(&self, collection_name: &str, ids: &[DataPointId]) -> Result<Vec<ScoredResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .request(reqwest::Method::POST, &self.collection_url(collection_name, "/retrieve"))
            .json(&RetrieveRequest {
                ids: ids.iter().map(|id| (*id).into()).collect(),
            })
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let points: Vec<RemotePoint> = response
            .json()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        Ok(points
            .into_iter()
            .map(|p| ScoredResult {
                id: DataPointId::from_uuid(p.id),
                payload: p.payload,
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

        let response = self
            .request(reqwest::Method::POST, &self.collection_url(collection_name, "/search"))
            .json(&SearchRequest {
                vector: query_vector,
                limit,
                with_vector,
            })
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(collection = collection_name, "search against missing remote collection");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(CogneeError::CacheConnectionError(format!(
                "search failed: {}",
                response.status()
            )));
        }

        let points: Vec<RemoteScoredPoint> = response
            .json()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let candidates = points
            .into_iter()
            .map(|p| (DataPointId::from_uuid(p.id), p.distance, p.payload, p.vector))
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
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::POST, &self.collection_url(collection_name, "/delete"))
            .json(&DeleteRequest {
                ids: ids.iter().map(|id| (*id).into()).collect(),
            })
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(CogneeError::CacheConnectionError(format!(
                "delete_data_points failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn prune(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, &format!("{}/prune", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CogneeError::CacheConnectionError(format!("prune failed: {}", response.status())));
        }
        Ok(())
    }
}
