//! `TripletRetriever`: the baseline retriever. Reads candidate surface
//! forms straight out of `Triplet_text`, without resolving them back to
//! graph endpoints — see [`super::GraphCompletionRetriever`] for that.

use std::sync::Arc;

use async_trait::async_trait;

use cognee_common::Result;

use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::VectorStore;

use super::{answer_from_context, join_objects, require_collection, surface_text, RetrievedObject, Retriever, DEFAULT_TOP_K};

const COLLECTION: &str = "Triplet_text";
const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct TripletRetriever {
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<LlmGateway>,
    session: Arc<SessionManager>,
    top_k: usize,
    user_id: String,
    session_id: Option<String>,
}

impl TripletRetriever {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<LlmGateway>,
        session: Arc<SessionManager>,
        user_id: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            vector_store,
            llm,
            session,
            top_k: DEFAULT_TOP_K,
            user_id: user_id.into(),
            session_id,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Shared by [`super::CacheTripletRetriever`], which is identical apart
    /// from the collection it reads.
    pub(crate) async fn search_collection(&self, collection: &str, query: &str) -> Result<Vec<RetrievedObject>> {
        require_collection(self.vector_store.as_ref(), collection).await?;

        let results = self
            .vector_store
            .search(collection, Some(query), None, self.top_k, false)
            .await?;

        Ok(results
            .into_iter()
            .map(|r| RetrievedObject {
                id: r.id,
                text: surface_text(&r.payload),
                payload: r.payload,
                score: r.score,
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for TripletRetriever {
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>> {
        self.search_collection(COLLECTION, query).await
    }

    async fn get_context_from_objects(&self, _query: &str, objects: &[RetrievedObject]) -> String {
        join_objects(objects, CONTEXT_SEPARATOR)
    }

    async fn get_completion_from_context(
        &self,
        query: &str,
        objects: &[RetrievedObject],
        context: &str,
    ) -> Result<Vec<String>> {
        answer_from_context(
            &self.llm,
            &self.session,
            &self.user_id,
            self.session_id.as_deref(),
            query,
            objects.is_empty(),
            context,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingEngine;
    use crate::llm::provider::{LlmGatewayError, LlmProvider};
    use crate::llm::schema::ResponseSchema;
    use crate::vector::InMemoryVectorStore;
    use async_trait::async_trait;
    use cognee_common::model::DataPoint;
    use cognee_common::CogneeError;
    use serde_json::{json, Value};

    struct StubProvider;

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete_structured(
            &self,
            _text_input: &str,
            _system_prompt: &str,
            _schema: &ResponseSchema,
        ) -> Result<Value, LlmGatewayError> {
            Ok(json!({"text": "stub answer", "summary": "stub summary"}))
        }
    }

    fn gateway() -> Arc<LlmGateway> {
        Arc::new(LlmGateway::from_provider(Box::new(StubProvider), "stub", "stub-model"))
    }

    fn retriever() -> TripletRetriever {
        let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));
        TripletRetriever::new(vector_store, gateway(), Arc::new(SessionManager::new(None)), "u1", None)
    }

    #[tokio::test]
    async fn missing_collection_raises_no_data_error() {
        let retriever = retriever();
        let err = retriever.get_retrieved_objects("what happened?").await.unwrap_err();
        assert!(matches!(err, CogneeError::NoDataError(_)));
    }

    #[tokio::test]
    async fn empty_candidates_skip_llm_and_answer_with_empty_string() {
        let retriever = retriever();
        let context = retriever.get_context_from_objects("q", &[]).await;
        assert_eq!(context, "");
        let answer = retriever.get_completion_from_context("q", &[], &context).await.unwrap();
        assert_eq!(answer, vec!["".to_string()]);
    }

    #[tokio::test]
    async fn full_pipeline_returns_stub_answer_once_collection_exists() {
        let retriever = retriever();
        retriever.vector_store.create_collection(COLLECTION).await.unwrap();
        retriever
            .vector_store
            .create_data_points(
                COLLECTION,
                vec![DataPoint::new(json!({"text": "alice -- knows -- bob"}), vec!["text".to_string()])],
            )
            .await
            .unwrap();

        let answer = retriever.answer("who does alice know?").await.unwrap();
        assert_eq!(answer, vec!["stub answer".to_string()]);
    }
}
