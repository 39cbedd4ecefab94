//! `EntityCompletionRetriever`: extracts named entities from the query via
//! the LLM gateway (C5), resolves each to a graph node through the
//! `Entity_name` vector collection, then surfaces each entity's triplet
//! neighborhood as context.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cognee_common::{DataPointId, EntityId, Result};

use crate::graph::GraphCollaborator;
use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::VectorStore;

use super::{
    answer_from_context, join_objects, render_triplet_line, require_collection, RetrievedObject, Retriever,
    DEFAULT_TOP_K, EXTRACT_ENTITIES_SYSTEM_PROMPT,
};

const ENTITY_COLLECTION: &str = "Entity_name";
const CONTEXT_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ExtractedEntities {
    #[serde(default)]
    entities: Vec<String>,
}

pub struct EntityCompletionRetriever {
    vector_store: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphCollaborator>,
    llm: Arc<LlmGateway>,
    session: Arc<SessionManager>,
    top_k: usize,
    user_id: String,
    session_id: Option<String>,
}

impl EntityCompletionRetriever {
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

    /// Best textual match for `name` in the `Entity_name` collection, by id.
    async fn resolve_entity(&self, name: &str) -> Result<Option<EntityId>> {
        let matches = self.vector_store.search(ENTITY_COLLECTION, Some(name), None, 1, false).await?;
        Ok(matches.into_iter().next().map(|m| EntityId::from_uuid(m.id.0)))
    }
}

#[async_trait]
impl Retriever for EntityCompletionRetriever {
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>> {
        let extracted = self
            .llm
            .acreate_structured_output::<ExtractedEntities>(query, EXTRACT_ENTITIES_SYSTEM_PROMPT)
            .await?;

        if extracted.entities.is_empty() {
            return Ok(Vec::new());
        }

        require_collection(self.vector_store.as_ref(), ENTITY_COLLECTION).await?;

        let mut objects = Vec::new();
        for name in extracted.entities.iter().take(self.top_k) {
            let Some(entity_id) = self.resolve_entity(name).await? else {
                continue;
            };

            for triplet in self.graph.neighbors(entity_id).await? {
                let text = render_triplet_line(self.graph.as_ref(), &triplet).await;
                objects.push(RetrievedObject {
                    id: DataPointId::from_uuid(entity_id.0),
                    text,
                    payload: serde_json::to_value(&triplet).unwrap_or(serde_json::Value::Null),
                    score: 0.0,
                });
            }
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
    use crate::llm::provider::{LlmGatewayError, LlmProvider};
    use crate::llm::schema::ResponseSchema;
    use crate::vector::InMemoryVectorStore;
    use cognee_common::model::{DataPoint, Entity, Triplet};
    use serde_json::{json, Value};

    struct ExtractorStub(Vec<&'static str>);

    #[async_trait]
    impl LlmProvider for ExtractorStub {
        async fn complete_structured(
            &self,
            _text_input: &str,
            _system_prompt: &str,
            _schema: &ResponseSchema,
        ) -> std::result::Result<Value, LlmGatewayError> {
            Ok(json!({"entities": self.0}))
        }
    }

    #[tokio::test]
    async fn no_extracted_entities_returns_empty_candidates_without_touching_the_store() {
        let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));
        let graph: Arc<dyn GraphCollaborator> = Arc::new(InMemoryGraphCollaborator::new());
        let llm = Arc::new(LlmGateway::from_provider(Box::new(ExtractorStub(vec![])), "stub", "stub"));

        let retriever = EntityCompletionRetriever::new(vector_store, graph, llm, Arc::new(SessionManager::new(None)), "u1", None);
        let objects = retriever.get_retrieved_objects("hello").await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn resolves_extracted_entity_to_its_neighborhood() {
        let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));
        let in_memory_graph = InMemoryGraphCollaborator::new();

        let alice = EntityId::new();
        let bob = EntityId::new();
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
        in_memory_graph
            .insert_triplet(Triplet {
                source_node_id: alice,
                relationship_name: "knows".to_string(),
                target_node_id: bob,
                edge_payload: json!({}),
            })
            .await;

        vector_store.create_collection(ENTITY_COLLECTION).await.unwrap();
        vector_store
            .create_data_points(
                ENTITY_COLLECTION,
                vec![DataPoint {
                    id: DataPointId::from_uuid(alice.0),
                    payload: json!({"text": "Alice"}),
                    metadata: cognee_common::model::DataPointMetadata {
                        index_fields: vec!["text".to_string()],
                    },
                }],
            )
            .await
            .unwrap();

        let graph: Arc<dyn GraphCollaborator> = Arc::new(in_memory_graph);
        let llm = Arc::new(LlmGateway::from_provider(Box::new(ExtractorStub(vec!["Alice"])), "stub", "stub"));

        let retriever = EntityCompletionRetriever::new(vector_store, graph, llm, Arc::new(SessionManager::new(None)), "u1", None);
        let objects = retriever.get_retrieved_objects("who does alice know?").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].text, "Alice -- knows -- Bob");
    }
}
