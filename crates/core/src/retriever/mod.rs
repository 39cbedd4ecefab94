//! Retriever core (C9): the two/three-phase retrieve -> contextualize ->
//! generate pipeline that composes the vector store (C6), LLM gateway (C5),
//! session manager (C8), and graph collaborator (C12) into question
//! answering with optional conversation memory. Every variant shares one
//! [`Retriever`] contract; only candidate gathering and context formatting
//! differ between them.

pub mod cache_triplet;
pub mod entity_completion;
pub mod graph_completion;
pub mod temporal;
pub mod triplet;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cognee_common::model::{Entity, Triplet};
use cognee_common::{CogneeError, DataPointId, Result};

pub use cache_triplet::CacheTripletRetriever;
pub use entity_completion::EntityCompletionRetriever;
pub use graph_completion::GraphCompletionRetriever;
pub use temporal::TemporalRetriever;
pub use triplet::TripletRetriever;

use crate::graph::GraphCollaborator;
use crate::llm::LlmGateway;
use crate::session::SessionManager;
use crate::vector::VectorStore;

/// Default top-k candidate count, shared by every variant unless overridden
/// via its `with_top_k` builder method.
pub const DEFAULT_TOP_K: usize = 5;

/// A candidate surfaced by [`Retriever::get_retrieved_objects`]: an id, its
/// rendered surface text (already in the form the context phase will
/// join — a triplet's surface form, a `"nodeA -- relation -- nodeB"` line,
/// or an event's text), the originating payload, and its similarity score.
#[derive(Clone, Debug)]
pub struct RetrievedObject {
    pub id: DataPointId,
    pub text: String,
    pub payload: serde_json::Value,
    pub score: f32,
}

/// Three-phase contract every retriever variant implements. A well-behaved
/// implementation never invokes the LLM gateway (C5) in
/// [`Retriever::get_completion_from_context`] when `objects` is empty —
/// an empty candidate set yields an empty-string answer, not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Locate candidates via vector search on a well-known collection.
    /// Raises [`CogneeError::NoDataError`] if the required collection
    /// doesn't exist.
    async fn get_retrieved_objects(&self, query: &str) -> Result<Vec<RetrievedObject>>;

    /// Format candidates into a context block.
    async fn get_context_from_objects(&self, query: &str, objects: &[RetrievedObject]) -> String;

    /// Generate the final answer(s) from `context`, optionally prepending
    /// conversation history and persisting the resulting Q/A.
    async fn get_completion_from_context(
        &self,
        query: &str,
        objects: &[RetrievedObject],
        context: &str,
    ) -> Result<Vec<String>>;

    /// Run all three phases in sequence.
    async fn answer(&self, query: &str) -> Result<Vec<String>> {
        let objects = self.get_retrieved_objects(query).await?;
        let context = self.get_context_from_objects(query, &objects).await;
        self.get_completion_from_context(query, &objects, &context).await
    }
}

pub(crate) const ANSWER_SIMPLE_QUESTION_SYSTEM_PROMPT: &str =
    "Answer the user's question using only the information in the provided context. \
If the context does not contain enough information to answer, say so plainly instead of guessing.";

pub(crate) const SUMMARIZE_CONTEXT_SYSTEM_PROMPT: &str =
    "Summarize the following context in a few sentences, preserving the facts relevant to the \
question, for storage in conversation history.";

pub(crate) const EXTRACT_ENTITIES_SYSTEM_PROMPT: &str =
    "Extract the named entities (people, places, organizations, or concepts) mentioned in the \
user's question. Return an empty list if none are present.";

pub(crate) const EXTRACT_INTERVAL_SYSTEM_PROMPT: &str =
    "Extract the time interval the user's question refers to, as ISO 8601 dates (YYYY-MM-DD). \
Leave a bound absent if the question does not imply it.";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub(crate) struct AnswerOutput {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub(crate) struct SummaryOutput {
    pub summary: String,
}

/// Join rendered candidate texts with `separator`; an empty candidate set
/// renders as an empty string, never as an empty-separator artifact.
pub(crate) fn join_objects(objects: &[RetrievedObject], separator: &str) -> String {
    if objects.is_empty() {
        return String::new();
    }
    objects.iter().map(|o| o.text.as_str()).collect::<Vec<_>>().join(separator)
}

/// Render the `context_for_question` user-prompt template: history block
/// (already terminated by its own blank line, or empty), then context, then
/// the question itself.
pub(crate) fn render_context_for_question(history_block: &str, context: &str, query: &str) -> String {
    format!("{history_block}Context:\n{context}\n\nQuestion: {query}")
}

/// Pull the `"text"` field out of a [`DataPoint`](cognee_common::model::DataPoint)
/// payload snapshot, falling back to the raw JSON when the field is absent
/// or non-string (defensive — every adapter is expected to index a `text`
/// field into `Triplet_text`/`cache`).
pub(crate) fn surface_text(payload: &serde_json::Value) -> String {
    payload
        .get("text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}

/// Phase 3, shared by every variant: optionally prepend conversation
/// history, generate the answer, and — when session caching is available —
/// summarize the context for storage concurrently with answer generation
/// (`tokio::join!`), persisting both to the session manager afterward.
pub(crate) async fn answer_from_context(
    llm: &LlmGateway,
    session: &SessionManager,
    user_id: &str,
    session_id: Option<&str>,
    query: &str,
    objects_empty: bool,
    context: &str,
) -> Result<Vec<String>> {
    if objects_empty {
        return Ok(vec![String::new()]);
    }

    let history = session.latest_entries(user_id, session_id, 5).await?;
    let history_block = SessionManager::format_history_block(&history);
    let user_prompt = render_context_for_question(&history_block, context, query);

    let answer = if session.is_available() {
        let (answer_result, summary_result) = tokio::join!(
            llm.acreate_structured_output::<AnswerOutput>(&user_prompt, ANSWER_SIMPLE_QUESTION_SYSTEM_PROMPT),
            llm.acreate_structured_output::<SummaryOutput>(context, SUMMARIZE_CONTEXT_SYSTEM_PROMPT),
        );

        let answer = answer_result?.text;
        let stored_context = match summary_result {
            Ok(summary) => summary.summary,
            Err(e) => {
                tracing::warn!(error = %e, "context summarization failed, storing raw context");
                context.to_string()
            }
        };

        session.record_qa(user_id, session_id, query, &stored_context, &answer).await?;
        answer
    } else {
        llm.acreate_structured_output::<AnswerOutput>(&user_prompt, ANSWER_SIMPLE_QUESTION_SYSTEM_PROMPT)
            .await?
            .text
    };

    Ok(vec![answer])
}

/// `CogneeError::NoDataError` if `name` doesn't exist on `vector_store`.
pub(crate) async fn require_collection(vector_store: &dyn VectorStore, name: &str) -> Result<()> {
    if vector_store.has_collection(name).await {
        Ok(())
    } else {
        Err(CogneeError::NoDataError(format!("collection '{name}' not found")))
    }
}

/// Render a triplet as `"nodeA -- relation -- nodeB"`, resolving endpoint
/// names through the graph collaborator and falling back to the raw id
/// string when a node can't be resolved.
pub(crate) async fn render_triplet_line(graph: &dyn GraphCollaborator, triplet: &Triplet) -> String {
    let source_name = entity_label(graph, triplet.source_node_id).await;
    let target_name = entity_label(graph, triplet.target_node_id).await;
    format!("{source_name} -- {} -- {target_name}", triplet.relationship_name)
}

async fn entity_label(graph: &dyn GraphCollaborator, id: cognee_common::EntityId) -> String {
    match graph.get_entity(id).await {
        Ok(Some(Entity { name, .. })) if !name.is_empty() => name,
        _ => id.to_string(),
    }
}
