//! `CacheTripletRetriever`: same contract as [`super::TripletRetriever`],
//! reading from the cache-backed vector engine's `"cache"` collection
//! instead of `Triplet_text` — used when the query-answering path wants to
//! favor previously-surfaced, cheaply re-retrievable candidates over a
//! fresh graph traversal.

use std::sync::Arc;

use async_trait::async_trait;

use cognee_common::Result;

use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::VectorStore;

use super::triplet::TripletRetriever;
use super::{RetrievedObject, Retriever};

const COLLECTION: &str = "cache";

pub struct CacheTripletRetriever {
    inner: TripletRetriever,
}

impl CacheTripletRetriever {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<LlmGateway>,
        session: Arc<SessionManager>,
        user_id: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            inner: TripletRetriever::new(vector_store, llm, session, user_id, session_id),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.inner = self.inner.with_top_k(top_k);
        self
    }
}

#[async_trait]
impl Retriever for CacheTripletRetriever {
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>> {
        self.inner.search_collection(COLLECTION, query).await
    }

    async fn get_context_from_objects(&self, query: &str, objects: &[RetrievedObject]) -> String {
        self.inner.get_context_from_objects(query, objects).await
    }

    async fn get_completion_from_context(
        &self,
        query: &str,
        objects: &[RetrievedObject],
        context: &str,
    ) -> Result<Vec<String>> {
        self.inner.get_completion_from_context(query, objects, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingEngine;
    use crate::vector::InMemoryVectorStore;
    use cognee_common::model::DataPoint;
    use cognee_common::CogneeError;
    use serde_json::json;

    fn store() -> Arc<dyn VectorStore> {
        Arc::new(InMemoryVectorStore::new(Arc::new(MockEmbeddingEngine::new(4))))
    }

    #[tokio::test]
    async fn reads_from_cache_collection_not_triplet_text() {
        let store = store();
        store.create_collection("cache").await.unwrap();
        store
            .create_data_points(
                "cache",
                vec![DataPoint::new(json!({"text": "cached fact"}), vec!["text".to_string()])],
            )
            .await
            .unwrap();

        let retriever = CacheTripletRetriever::new(
            store,
            Arc::new(LlmGateway::from_provider(
                Box::new(crate::llm::provider::OpenAiProvider::new(
                    cognee_common::config::LlmConfig::from_env(),
                )),
                "unused",
                "unused",
            )),
            Arc::new(SessionManager::new(None)),
            "u1",
            None,
        );

        let objects = retriever.get_retrieved_objects("anything").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].text, "cached fact");
    }

    #[tokio::test]
    async fn missing_cache_collection_raises_no_data_error() {
        let retriever = CacheTripletRetriever::new(
            store(),
            Arc::new(LlmGateway::from_provider(
                Box::new(crate::llm::provider::OpenAiProvider::new(
                    cognee_common::config::LlmConfig::from_env(),
                )),
                "unused",
                "unused",
            )),
            Arc::new(SessionManager::new(None)),
            "u1",
            None,
        );
        let err = retriever.get_retrieved_objects("q").await.unwrap_err();
        assert!(matches!(err, CogneeError::NoDataError(_)));
    }
}
