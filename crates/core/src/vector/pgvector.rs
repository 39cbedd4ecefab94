use std::sync::Arc;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use cognee_common::model::{DataPoint, ScoredResult};
use cognee_common::{CogneeError, DataPointId, Result};

use crate::embeddings::EmbeddingEngine;

use super::{rank_candidates, resolve_query_vector, VectorStore};

/// Postgres + `pgvector` backend: one table per collection, `<=>`
/// cosine-distance operator for nearest-neighbor search.
pub struct PgVectorStore {
    pool: PgPool,
    embedding_engine: Arc<dyn EmbeddingEngine>,
    dimensions: u32,
}

impl PgVectorStore {
    pub async fn connect(database_url: &str, embedding_engine: Arc<dyn EmbeddingEngine>) -> Result<Self> {
        tracing::info!("connecting to pgvector store");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&pool)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let dimensions = embedding_engine.get_vector_size();
        Ok(Self {
            pool,
            embedding_engine,
            dimensions,
        })
    }

    /// Collection names become table names — quote the identifier and
    /// reject anything that isn't a simple alphanumeric/underscore token
    /// rather than attempting to escape arbitrary SQL identifiers.
    fn table_name(collection_name: &str) -> Result<String> {
        if collection_name.is_empty()
            || !collection_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CogneeError::InvalidValueError(format!(
                "invalid collection name: {collection_name}"
            )));
        }
        Ok(format!("vs_{collection_name}"))
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn has_collection(&self, collection_name: &str) -> bool {
        let Ok(table) = Self::table_name(collection_name) else {
            return false;
        };
        sqlx::query("SELECT 1 FROM information_schema.tables WHERE table_name = $1")
            .bind(&table)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
            .is_some()
    }

    async fn create_collection(&self, collection_name: &str) -> Result<()> {
        let table = Self::table_name(collection_name)?;
        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id UUID PRIMARY KEY, \
                payload JSONB NOT NULL, \
                embedding VECTOR({dims}) NOT NULL)",
            dims = self.dimensions
        );
        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn create_data_points(&self, collection_name: &str, points: Vec<DataPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        if !self.has_collection(collection_name).await {
            return Err(CogneeError::CollectionNotFound(collection_name.to_string()));
        }

        let table = Self::table_name(collection_name)?;
        let texts: Vec<String> = points.iter().map(|p| p.index_text()).collect();
        let vectors = self
            .embedding_engine
            .embed_text(&texts)
            .await
            .map_err(CogneeError::from)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        for (point, vector) in points.into_iter().zip(vectors) {
            let statement = format!(
                "INSERT INTO {table} (id, payload, embedding) VALUES ($1, $2, $3) \
                 ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, embedding = EXCLUDED.embedding"
            );
            sqlx::query(&statement)
                .bind(uuid::Uuid::from(point.id))
                .bind(&point.payload)
                .bind(Vector::from(vector))
                .execute(&mut *tx)
                .await
                .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn retrieve(&self, collection_name: &str, ids: &[DataPointId]) -> Result<Vec<ScoredResult>> {
        if ids.is_empty() || !self.has_collection(collection_name).await {
            return Ok(Vec::new());
        }
        let table = Self::table_name(collection_name)?;
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| uuid::Uuid::from(*id)).collect();

        let statement = format!("SELECT id, payload FROM {table} WHERE id = ANY($1)");
        let rows = sqlx::query(&statement)
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| ScoredResult {
                id: DataPointId::from_uuid(row.get("id")),
                payload: row.get("payload"),
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
        if !self.has_collection(collection_name).await {
            return Err(CogneeError::CollectionNotFound(collection_name.to_string()));
        }

        let query_vector = resolve_query_vector(&self.embedding_engine, text, vector).await?;
        let table = Self::table_name(collection_name)?;

        let statement =
            format!("SELECT id, payload, embedding, embedding <=> $1 AS distance FROM {table}");
        let rows = sqlx::query(&statement)
            .bind(Vector::from(query_vector))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let candidates = rows
            .into_iter()
            .map(|row| {
                let id: uuid::Uuid = row.get("id");
                let distance: f32 = row.get("distance");
                let payload: serde_json::Value = row.get("payload");
                let returned_vector = if with_vector {
                    let raw: Vector = row.get("embedding");
                    Some(raw.to_vec())
                } else {
                    None
                };
                (DataPointId::from_uuid(id), distance, payload, returned_vector)
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
        if ids.is_empty() || !self.has_collection(collection_name).await {
            return Ok(());
        }
        let table = Self::table_name(collection_name)?;
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| uuid::Uuid::from(*id)).collect();
        let statement = format!("DELETE FROM {table} WHERE id = ANY($1)");
        sqlx::query(&statement)
            .bind(&uuids)
            .execute(&self.pool)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn prune(&self) -> Result<()> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables WHERE table_name LIKE 'vs_%'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        for row in rows {
            let table: String = row.get("table_name");
            let statement = format!("DROP TABLE IF EXISTS {table}");
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        }
        Ok(())
    }
}
