//! End-to-end scenarios crossing module boundaries through the crate's
//! public surface — vector store + embedding engine, session + cache, and
//! the retriever core composing graph/vector/LLM/session together. Unit
//! behavior for each component lives in its own `#[cfg(test)]` module;
//! these exercise the seams between them the way a caller actually would.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use cognee_common::model::{DataPoint, Entity, QAEntry, Triplet};
use cognee_common::{CogneeError, EntityId};

use cognee_core::cache::{CacheEngine, FsCacheEngine, QaUpdate};
use cognee_core::embeddings::MockEmbeddingEngine;
use cognee_core::graph::{GraphCollaborator, InMemoryGraphCollaborator};
use cognee_core::llm::provider::{LlmGatewayError, LlmProvider};
use cognee_core::llm::schema::ResponseSchema;
use cognee_core::llm::LlmGateway;
use cognee_core::retriever::{GraphCompletionRetriever, Retriever, TripletRetriever};
use cognee_core::session::SessionManager;
use cognee_core::vector::{InMemoryVectorStore, VectorStore};

struct StubAnswerer;

#[async_trait]
impl LlmProvider for StubAnswerer {
    async fn complete_structured(
        &self,
        _text_input: &str,
        _system_prompt: &str,
        _schema: &ResponseSchema,
    ) -> Result<Value, LlmGatewayError> {
        Ok(json!({"text": "stub answer", "summary": "stub summary"}))
    }
}

fn stub_gateway() -> Arc<LlmGateway> {
    Arc::new(LlmGateway::from_provider(Box::new(StubAnswerer), "stub", "stub-model"))
}

/// Scenario 1 (spec §8): embed-insert-search round trip, then delete.
#[tokio::test]
async fn embed_insert_search_round_trip() {
    let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
    let store = InMemoryVectorStore::new(embedding_engine);
    store.create_collection("docs").await.unwrap();

    let alpha = DataPoint::new(json!({"text": "alpha"}), vec!["text".to_string()]);
    let beta = DataPoint::new(json!({"text": "beta"}), vec!["text".to_string()]);
    let gamma = DataPoint::new(json!({"text": "gamma"}), vec!["text".to_string()]);
    let alpha_id = alpha.id.clone();

    store
        .create_data_points("docs", vec![alpha, beta, gamma])
        .await
        .unwrap();

    let results = store.search("docs", Some("alpha"), None, 3, false).await.unwrap();
    assert_eq!(results.len(), 3);

    store.delete_data_points("docs", &[alpha_id.clone()]).await.unwrap();
    let remaining = store.search("docs", Some("alpha"), None, 3, false).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|r| r.id != alpha_id));
}

/// Scenario 4 (spec §8): session flow through the cache coordinator,
/// including the feedback-score validation boundary.
#[tokio::test]
async fn session_flow_records_and_validates_feedback() {
    let mut path = std::env::temp_dir();
    path.push(format!("cognee-scenario-session-{}.json", uuid::Uuid::new_v4()));
    let cache: Arc<dyn CacheEngine> = Arc::new(FsCacheEngine::open(&path).await.unwrap());
    let session = SessionManager::new(Some(cache));

    let qa_id = session
        .record_qa("u1", None, "what is rust?", "ctx", "a systems language")
        .await
        .unwrap()
        .unwrap();

    let entries = session.latest_entries("u1", Some("default_session"), 1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].question, "what is rust?");

    let updated = session
        .update_entry(
            "u1",
            None,
            qa_id,
            QaUpdate {
                answer: None,
                context: None,
                feedback_text: None,
                feedback_score: Some(5),
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let entries = session.all_entries("u1", None).await.unwrap();
    assert_eq!(entries[0].feedback_score, Some(5));

    let err = session
        .update_entry(
            "u1",
            None,
            qa_id,
            QaUpdate {
                answer: None,
                context: None,
                feedback_text: None,
                feedback_score: Some(10),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CogneeError::SessionQAEntryValidationError(_)));

    let _ = std::fs::remove_file(path);
}

fn qa_entry(question: &str) -> QAEntry {
    QAEntry::new(cognee_common::QaId::new(), question, "ctx", "answer")
}

#[test]
fn qa_entry_helper_round_trips_question() {
    let entry = qa_entry("sanity");
    assert_eq!(entry.question, "sanity");
}

/// Scenario 6 (spec §8): with no cache configured, the retriever still
/// produces a completion and no error surfaces from the missing history.
#[tokio::test]
async fn cache_unavailable_degradation_still_answers() {
    let embedding_engine = Arc::new(MockEmbeddingEngine::new(4));
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine));
    vector_store.create_collection("Triplet_text").await.unwrap();
    vector_store
        .create_data_points(
            "Triplet_text",
            vec![DataPoint::new(json!({"text": "alice -- knows -- bob"}), vec!["text".to_string()])],
        )
        .await
        .unwrap();

    let retriever = TripletRetriever::new(vector_store, stub_gateway(), Arc::new(SessionManager::new(None)), "u1", None);

    let answer = retriever.answer("who does alice know?").await.unwrap();
    assert_eq!(answer, vec!["stub answer".to_string()]);
}

/// Full C9 composition: graph + vector + LLM + session wired together via
/// `GraphCompletionRetriever`, resolving a candidate's stored node ids back
/// through the graph collaborator and producing an answer through the
/// shared `answer_from_context` path.
#[tokio::test]
async fn graph_completion_retriever_composes_graph_and_vector_layers() {
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
    in_memory_graph
        .insert_triplet(Triplet {
            source_node_id: alice,
            relationship_name: "knows".to_string(),
            target_node_id: bob,
            edge_payload: json!({}),
        })
        .await;
    let graph: Arc<dyn GraphCollaborator> = Arc::new(in_memory_graph);

    vector_store.create_collection("Triplet_text").await.unwrap();
    vector_store
        .create_data_points(
            "Triplet_text",
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

    let retriever = GraphCompletionRetriever::new(
        vector_store,
        graph,
        stub_gateway(),
        Arc::new(SessionManager::new(None)),
        "u1",
        None,
    );

    let answer = retriever.answer("who knows bob?").await.unwrap();
    assert_eq!(answer, vec!["stub answer".to_string()]);
}
