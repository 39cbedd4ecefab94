//! `TemporalRetriever`: extracts a time interval from the query via the LLM
//! gateway (C5), collects matching events from the graph collaborator
//! (C12), and reranks them by embedding similarity. Falls back to a plain
//! [`super::TripletRetriever`] pass when no interval can be extracted or no
//! events fall inside it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cognee_common::model::Event;
use cognee_common::{DataPointId, Result};

use crate::embeddings::EmbeddingEngine;
use crate::graph::GraphCollaborator;
use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::{cosine_distance, rank_candidates, VectorStore};

use super::triplet::TripletRetriever;
use super::{answer_from_context, join_objects, RetrievedObject, Retriever, DEFAULT_TOP_K, EXTRACT_INTERVAL_SYSTEM_PROMPT};

const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct QueryInterval {
    #[serde(default)]
    time_from: Option<String>,
    #[serde(default)]
    time_to: Option<String>,
}

/// Parse an ISO 8601 date-time or bare `YYYY-MM-DD` date, the two shapes
/// the extraction prompt is told to produce.
fn parse_bound(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

pub struct TemporalRetriever {
    graph: Arc<dyn GraphCollaborator>,
    embedding_engine: Arc<dyn EmbeddingEngine>,
    llm: Arc<LlmGateway>,
    session: Arc<SessionManager>,
    fallback: TripletRetriever,
    top_k: usize,
    user_id: String,
    session_id: Option<String>,
}

impl TemporalRetriever {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphCollaborator>,
        embedding_engine: Arc<dyn EmbeddingEngine>,
        llm: Arc<LlmGateway>,
        session: Arc<SessionManager>,
        user_id: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        let user_id = user_id.into();
        let fallback = TripletRetriever::new(vector_store, llm.clone(), session.clone(), user_id.clone(), session_id.clone());
        Self {
            graph,
            embedding_engine,
            llm,
            session,
            fallback,
            top_k: DEFAULT_TOP_K,
            user_id,
            session_id,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self.fallback = self.fallback.with_top_k(top_k);
        self
    }

    /// `Some(objects)` when an interval was extracted and matched at least
    /// one event; `None` tells the caller to fall back to the triplet path.
    async fn events_in_window(&self, query: &str) -> Result<Option<Vec<RetrievedObject>>> {
        let interval = self
            .llm
            .acreate_structured_output::<QueryInterval>(query, EXTRACT_INTERVAL_SYSTEM_PROMPT)
            .await?;

        let time_from = interval.time_from.as_deref().and_then(parse_bound);
        let time_to = interval.time_to.as_deref().and_then(parse_bound);
        if time_from.is_none() && time_to.is_none() {
            return Ok(None);
        }

        let ids = self.graph.collect_time_ids(time_from, time_to).await?;
        if ids.is_empty() {
            return Ok(None);
        }

        let events = self.graph.collect_events(&ids).await?;
        if events.is_empty() {
            return Ok(None);
        }

        let query_vector = self
            .embedding_engine
            .embed_text(&[query.to_string()])
            .await
            .map_err(cognee_common::CogneeError::from)?
            .pop()
            .unwrap_or_default();

        Ok(Some(rerank_events(self.embedding_engine.as_ref(), &query_vector, events, self.top_k).await?))
    }
}

async fn rerank_events(
    embedding_engine: &dyn EmbeddingEngine,
    query_vector: &[f32],
    events: Vec<Event>,
    top_k: usize,
) -> Result<Vec<RetrievedObject>> {
    let texts: Vec<String> = events.iter().map(|e| e.text.clone()).collect();
    let event_vectors = embedding_engine.embed_text(&texts).await.map_err(cognee_common::CogneeError::from)?;

    let candidates = events
        .iter()
        .zip(event_vectors.iter())
        .map(|(event, vector)| {
            let distance = cosine_distance(query_vector, vector);
            (
                DataPointId::from_uuid(event.id.0),
                distance,
                serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
                None,
            )
        })
        .collect();

    let ranked = rank_candidates(candidates, top_k);
    Ok(ranked
        .into_iter()
        .map(|r| {
            let text = r
                .payload
                .get("text")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_default();
            RetrievedObject {
                id: r.id,
                text,
                payload: r.payload,
                score: r.score,
            }
        })
        .collect())
}

#[async_trait]
impl Retriever for TemporalRetriever {
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>> {
        match self.events_in_window(query).await? {
            Some(objects) => Ok(objects),
            None => self.fallback.get_retrieved_objects(query).await,
        }
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
    use cognee_common::model::DataPoint;
    use cognee_common::EventId;
    use serde_json::{json, Value};

    struct IntervalStub {
        time_from: Option<&'static str>,
        time_to: Option<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for IntervalStub {
        async fn complete_structured(
            &self,
            _text_input: &str,
            _system_prompt: &str,
            _schema: &ResponseSchema,
        ) -> std::result::Result<Value, LlmGatewayError> {
            Ok(json!({"time_from": self.time_from, "time_to": self.time_to}))
        }
    }

    fn make(graph: Arc<dyn GraphCollaborator>, llm: Arc<LlmGateway>) -> (TemporalRetriever, Arc<dyn VectorStore>) {
        let embedding_engine: Arc<dyn EmbeddingEngine> = Arc::new(MockEmbeddingEngine::new(4));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding_engine.clone()));
        let retriever = TemporalRetriever::new(
            vector_store.clone(),
            graph,
            embedding_engine,
            llm,
            Arc::new(SessionManager::new(None)),
            "u1",
            None,
        );
        (retriever, vector_store)
    }

    #[test]
    fn parse_bound_accepts_bare_dates_and_rfc3339() {
        assert!(parse_bound("2024-01-05").is_some());
        assert!(parse_bound("2024-01-05T10:00:00Z").is_some());
        assert!(parse_bound("not a date").is_none());
    }

    #[tokio::test]
    async fn no_interval_falls_back_to_triplet_retriever() {
        let graph: Arc<dyn GraphCollaborator> = Arc::new(InMemoryGraphCollaborator::new());
        let llm = Arc::new(LlmGateway::from_provider(
            Box::new(IntervalStub { time_from: None, time_to: None }),
            "stub",
            "stub",
        ));
        let (retriever, vector_store) = make(graph, llm);
        vector_store.create_collection("Triplet_text").await.unwrap();
        vector_store
            .create_data_points(
                "Triplet_text",
                vec![DataPoint::new(json!({"text": "fallback fact"}), vec!["text".to_string()])],
            )
            .await
            .unwrap();

        let objects = retriever.get_retrieved_objects("what is true?").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].text, "fallback fact");
    }

    #[tokio::test]
    async fn interval_with_matching_events_reranks_by_similarity() {
        let in_memory_graph = InMemoryGraphCollaborator::new();
        in_memory_graph
            .insert_event(Event {
                id: EventId::new(),
                text: "the meeting happened".to_string(),
                occurred_at: Some(parse_bound("2024-02-01").unwrap()),
                description: None,
            })
            .await;
        let graph: Arc<dyn GraphCollaborator> = Arc::new(in_memory_graph);

        let llm = Arc::new(LlmGateway::from_provider(
            Box::new(IntervalStub {
                time_from: Some("2024-01-01"),
                time_to: Some("2024-03-01"),
            }),
            "stub",
            "stub",
        ));
        let (retriever, _vector_store) = make(graph, llm);

        let objects = retriever.get_retrieved_objects("what happened in february?").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].text, "the meeting happened");
    }
}
