//! Data model shared across the vector store, cache, session, and retriever
//! components (§3 of the data model: `DataPoint`, `ScoredResult`,
//! `QAEntry`, `UsageLogEntry`, `Triplet`, `Entity`, `Event`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DataPointId, EntityId, EventId, QaId, SessionUsageId};

/// Recognized metadata keys on a [`DataPoint`]. Currently only
/// `index_fields` is recognized: the ordered list of payload field names
/// whose textual content defines the embedding.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DataPointMetadata {
    #[serde(default)]
    pub index_fields: Vec<String>,
}

/// A record owned by whichever [`Collection`] it is inserted into: a stable
/// id, an open payload mapping, and metadata naming which payload fields
/// define the embeddable text. Embedded once per mutation by the vector
/// store, never by the caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub id: DataPointId,
    pub payload: Value,
    #[serde(default)]
    pub metadata: DataPointMetadata,
}

impl DataPoint {
    pub fn new(payload: Value, index_fields: Vec<String>) -> Self {
        Self {
            id: DataPointId::new(),
            payload,
            metadata: DataPointMetadata { index_fields },
        }
    }

    /// Concatenate the text of every field named in `metadata.index_fields`,
    /// in order, separated by newlines. Fields missing from the payload or
    /// not string-valued are skipped.
    pub fn index_text(&self) -> String {
        self.metadata
            .index_fields
            .iter()
            .filter_map(|field| self.payload.get(field)?.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An immutable value returned by a vector search or retrieve call: an id,
/// a payload snapshot, a normalized distance score in `[0, 1]` (0 = closest
/// match within the batch, 1 = farthest), and an optional raw vector when
/// `with_vector` was requested.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub id: DataPointId,
    pub payload: Value,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// One turn of a cached conversation, owned by a `(user_id, session_id)`
/// key. `feedback_score`, when present, is an integer in `[0, 5]`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QAEntry {
    pub qa_id: QaId,
    pub time: DateTime<Utc>,
    pub question: String,
    pub context: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_score: Option<i32>,
}

impl QAEntry {
    pub fn new(
        qa_id: QaId,
        question: impl Into<String>,
        context: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            qa_id,
            time: Utc::now(),
            question: question.into(),
            context: context.into(),
            answer: answer.into(),
            feedback_text: None,
            feedback_score: None,
        }
    }
}

/// A single recorded invocation of an instrumented function: parameters,
/// result, success/failure, and timing. Append-only, TTL-bounded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageLogEntry {
    pub id: SessionUsageId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub function_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub parameters: Value,
    pub result: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

/// A subject-predicate-object fact surfaced by graph traversal, with the
/// free text surface form indexed in the `Triplet_text` vector collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Triplet {
    pub source_node_id: EntityId,
    pub relationship_name: String,
    pub target_node_id: EntityId,
    pub edge_payload: Value,
}

/// A named entity resolved from the knowledge graph; read-only from this
/// crate's perspective.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A time-bounded occurrence resolved from the knowledge graph, used by
/// the temporal retriever.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_text_joins_named_fields_in_order() {
        let dp = DataPoint::new(
            json!({"title": "alpha", "body": "beta", "ignored": "gamma"}),
            vec!["title".to_string(), "body".to_string()],
        );
        assert_eq!(dp.index_text(), "alpha\nbeta");
    }

    #[test]
    fn index_text_skips_missing_or_non_string_fields() {
        let dp = DataPoint::new(
            json!({"title": "alpha", "count": 3}),
            vec!["title".to_string(), "count".to_string(), "missing".to_string()],
        );
        assert_eq!(dp.index_text(), "alpha");
    }
}
