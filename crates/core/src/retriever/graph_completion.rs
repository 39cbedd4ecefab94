//! `GraphCompletionRetriever`: resolves `Triplet_text` candidates back to
//! their graph endpoints and renders `"nodeA -- relation -- nodeB"` lines,
//! rather than returning the raw indexed surface form the way
//! [`super::TripletRetriever`] does.

use std::sync::Arc;

use async_trait::async_trait;

use cognee_common::model::Triplet;
use cognee_common::Result;

use crate::graph::GraphCollaborator;
use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::VectorStore;

use super::{
    answer_from_context, join_objects, render_triplet_line, require_collection, surface_text, RetrievedObject,
    Retriever, DEFAULT_TOP_K,
};

const COLLECTION: &str = "Triplet_text";
const CONTEXT_SEPARATOR: &str = "\n---\n";

pub struct GraphCompletionRetriever {
    vector_store: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphCollaborator>,
    llm: Arc<LlmGateway>,
    session: Arc<SessionManager>,
    top_k: usize,
    user_id: String,
    session_id: Option<String>,
}

impl GraphCompletionRetriever {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphCollaborator>,
        llm: Arc<LlmGateway>,
        session: Arc<SessionManager>,
        user_id: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            vector_store,
            graph,
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
}

/// Recover a [`Triplet`]'s endpoints from a candidate's payload, trusting
/// the fields the ingestion pipeline stored alongside the surface text.
/// Returns `None` when those fields are absent, in which case the caller
/// keeps the raw surface text instead of a resolved line.
fn triplet_from_payload(payload: &serde_json::Value) -> Option<Triplet> {
    let source = payload.get("source_node_id")?.as_str()?;
    let target = payload.get("target_node_id")?.as_str()?;
    let relation = payload.get("relationship_name")?.as_str()?.to_string();

    Some(Triplet {
        source_node_id: cognee_common::EntityId::from_uuid(uuid::Uuid::parse_str(source).ok()?),
        relationship_name: relation,
        target_node_id: cognee_common::EntityId::from_uuid(uuid::Uuid::parse_str(target).ok()?),
        edge_payload: payload.get("edge_payload").cloned().unwrap_or(serde_json::Value::Null),
    })
}

#[async_trait]
impl Retriever for GraphCompletionRetriever {
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>> {
        require_collection(self.vector_store.as_ref(), COLLECTION).await?;

        let results = self
            .vector_store
            .search(COLLECTION, Some(query), None, self.top_k, false)
            .await?;

        let mut objects = Vec::with_capacity(results.len());
        for r in results {
            let text = match triplet_from_payload(&r.payload) {
                Some(triplet) => render_triplet_line(self.graph.as_ref(), &triplet).await,
                None => surface_text(&r.payload),
            };
            objects.push(RetrievedObject {
                id: r.id,
                text,
                payload: r.payload,
                score: r.score,
            });
        }
        Ok(objects)
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
    use crate::graph::InMemoryGraphCollaborator;
    use crate::llm::provider::OpenAiProvider;
    use crate::vector::InMemoryVectorStore;
    use cognee_common::config::LlmConfig;
    use cognee_common::model::{DataPoint, Entity};
    use cognee_common::EntityId;
    use serde_json::json;

    fn gateway() -> Arc<LlmGateway> {
        Arc::new(LlmGateway::from_provider(
            Box::new(OpenAiProvider::new(LlmConfig::from_env())),
            "unused",
            "unused",
        ))
    }

    #[tokio::test]
    async fn resolves_endpoint_names_via_graph_collaborator() {
        let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));

        let alice = EntityId::new();
        let bob = EntityId::new();
        let in_memory_graph = InMemoryGraphCollaborator::new();
        in_memory_graph
            .insert_entity(Entity {
                id: alice,
                name: "Alice".to_string(),
                description: None,
            })
            .await;
        in_memory_graph
            .insert_entity(Entity {
                id: bob,
                name: "Bob".to_string(),
                description: None,
            })
            .await;
        let graph: Arc<dyn GraphCollaborator> = Arc::new(in_memory_graph);

        vector_store.create_collection(COLLECTION).await.unwrap();
        vector_store
            .create_data_points(
                COLLECTION,
                vec![DataPoint::new(
                    json!({
                        "text": "alice -- knows -- bob",
                        "source_node_id": alice.to_string(),
                        "relationship_name": "knows",
                        "target_node_id": bob.to_string(),
                    }),
                    vec!["text".to_string()],
                )],
            )
            .await
            .unwrap();

        let retriever = GraphCompletionRetriever::new(vector_store, graph, gateway(), Arc::new(SessionManager::new(None)), "u1", None);
        let objects = retriever.get_retrieved_objects("who knows bob?").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].text, "Alice -- knows -- Bob");
    }

    #[tokio::test]
    async fn falls_back_to_surface_text_without_endpoint_fields() {
        let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));
        let graph: Arc<dyn GraphCollaborator> = Arc::new(InMemoryGraphCollaborator::new());

        vector_store.create_collection(COLLECTION).await.unwrap();
        vector_store
            .create_data_points(
                COLLECTION,
                vec![DataPoint::new(json!({"text": "raw surface form"}), vec!["text".to_string()])],
            )
            .await
            .unwrap();

        let retriever = GraphCompletionRetriever::new(vector_store, graph, gateway(), Arc::new(SessionManager::new(None)), "u1", None);
        let objects = retriever.get_retrieved_objects("q").await.unwrap();
        assert_eq!(objects[0].text, "raw surface form");
    }
}
