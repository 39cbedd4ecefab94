//! Graph collaborator (C12, ambient): the read-only surface retrievers need
//! from the knowledge graph. Entity resolution, ingestion, and the
//! construction pipeline that populates this graph are external
//! collaborators — this module only exposes the query shapes `cognee_core`
//! itself consumes, with one concrete adapter over Neo4j via `neo4rs`.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph, Node};

use cognee_common::model::{Entity, Event, Triplet};
use cognee_common::{CogneeError, EntityId, EventId, Result};

pub use memory::InMemoryGraphCollaborator;

/// Contract consumed by the retriever core (C9). Read-only: nothing here
/// writes to the graph.
#[async_trait]
pub trait GraphCollaborator: Send + Sync {
    /// Triplets whose source or target is `node_id`, in either direction.
    async fn neighbors(&self, node_id: EntityId) -> Result<Vec<Triplet>>;

    /// Ids of events whose window intersects `[time_from, time_to]`. Either
    /// bound may be absent, meaning unbounded on that side.
    async fn collect_time_ids(
        &self,
        time_from: Option<DateTime<Utc>>,
        time_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventId>>;

    /// Hydrate event payloads for the given ids, in no particular order;
    /// ids with no matching event are dropped.
    async fn collect_events(&self, ids: &[EventId]) -> Result<Vec<Event>>;

    /// Every triplet in the graph, used by `GraphCompletionRetriever` to
    /// resolve a candidate's textual surface form back to its endpoints.
    async fn dump_triplets(&self) -> Result<Vec<Triplet>>;

    /// Resolve an entity by id, used to render `"nodeA -- relation --
    /// nodeB"` lines with human-readable names instead of raw ids.
    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>>;
}

/// Neo4j-backed [`GraphCollaborator`]. Demonstrates the contract; schema
/// migration, multi-tenant sharding, and entity dedup belong to the
/// ingestion pipeline and are out of scope here.
pub struct Neo4jGraphCollaborator {
    graph: Graph,
}

impl Neo4jGraphCollaborator {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        tracing::info!(uri, "connecting to Neo4j");
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        let collaborator = Self { graph };
        collaborator.health_check().await?;
        Ok(collaborator)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;
        Ok(())
    }
}

fn node_entity_id(node: &Node) -> Result<EntityId> {
    let raw: String = node
        .get("id")
        .map_err(|e| CogneeError::InvalidValueError(format!("node missing id: {e}")))?;
    let uuid = uuid::Uuid::parse_str(&raw)
        .map_err(|e| CogneeError::InvalidValueError(format!("invalid entity id '{raw}': {e}")))?;
    Ok(EntityId::from_uuid(uuid))
}

fn node_to_entity(node: &Node) -> Result<Entity> {
    Ok(Entity {
        id: node_entity_id(node)?,
        name: node.get("name").unwrap_or_default(),
        description: node.get("description").ok(),
    })
}

fn node_to_event(node: &Node) -> Result<Event> {
    let raw_id: String = node
        .get("id")
        .map_err(|e| CogneeError::InvalidValueError(format!("event missing id: {e}")))?;
    let uuid = uuid::Uuid::parse_str(&raw_id)
        .map_err(|e| CogneeError::InvalidValueError(format!("invalid event id '{raw_id}': {e}")))?;

    let occurred_at: Option<String> = node.get("occurred_at").ok();
    Ok(Event {
        id: EventId::from_uuid(uuid),
        text: node.get("text").unwrap_or_default(),
        occurred_at: occurred_at.and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
        description: node.get("description").ok(),
    })
}

#[async_trait]
impl GraphCollaborator for Neo4jGraphCollaborator {
    async fn neighbors(&self, node_id: EntityId) -> Result<Vec<Triplet>> {
        let cypher = "MATCH (a:Entity {id: $id})-[r:RELATES_TO]-(b:Entity) \
                      RETURN a.id AS source, type(r) AS rel, b.id AS target, properties(r) AS props";
        let mut result = self
            .graph
            .execute(query(cypher).param("id", node_id.to_string()))
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut triplets = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?
        {
            triplets.push(row_to_triplet(&row)?);
        }
        Ok(triplets)
    }

    async fn collect_time_ids(
        &self,
        time_from: Option<DateTime<Utc>>,
        time_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventId>> {
        let mut where_parts = Vec::new();
        if time_from.is_some() {
            where_parts.push("e.occurred_at >= $time_from".to_string());
        }
        if time_to.is_some() {
            where_parts.push("e.occurred_at <= $time_to".to_string());
        }
        let where_clause = if where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_parts.join(" AND "))
        };

        let cypher = format!("MATCH (e:Event){where_clause} RETURN e.id AS id");
        let mut q = query(&cypher);
        if let Some(from) = time_from {
            q = q.param("time_from", from.to_rfc3339());
        }
        if let Some(to) = time_to {
            q = q.param("time_to", to.to_rfc3339());
        }

        let mut result = self
            .graph
            .execute(q)
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?
        {
            let raw: String = row
                .get("id")
                .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
            if let Ok(uuid) = uuid::Uuid::parse_str(&raw) {
                ids.push(EventId::from_uuid(uuid));
            }
        }
        Ok(ids)
    }

    async fn collect_events(&self, ids: &[EventId]) -> Result<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let mut result = self
            .graph
            .execute(query("MATCH (e:Event) WHERE e.id IN $ids RETURN e").param("ids", id_strings))
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut events = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?
        {
            let node: Node = row
                .get("e")
                .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
            events.push(node_to_event(&node)?);
        }
        Ok(events)
    }

    async fn dump_triplets(&self) -> Result<Vec<Triplet>> {
        let mut result = self
            .graph
            .execute(query(
                "MATCH (a:Entity)-[r:RELATES_TO]->(b:Entity) \
                 RETURN a.id AS source, type(r) AS rel, b.id AS target, properties(r) AS props",
            ))
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        let mut triplets = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?
        {
            triplets.push(row_to_triplet(&row)?);
        }
        Ok(triplets)
    }

    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        let mut result = self
            .graph
            .execute(query("MATCH (e:Entity {id: $id}) RETURN e").param("id", id.to_string()))
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?;

        match result
            .next()
            .await
            .map_err(|e| CogneeError::CacheConnectionError(e.to_string()))?
        {
            Some(row) => {
                let node: Node = row
                    .get("e")
                    .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
                Ok(Some(node_to_entity(&node)?))
            }
            None => Ok(None),
        }
    }
}

fn row_to_triplet(row: &neo4rs::Row) -> Result<Triplet> {
    let source: String = row
        .get("source")
        .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
    let target: String = row
        .get("target")
        .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
    let rel: String = row
        .get("rel")
        .map_err(|e| CogneeError::InvalidValueError(e.to_string()))?;
    let props: std::collections::HashMap<String, String> = row.get("props").unwrap_or_default();

    let source_id = uuid::Uuid::parse_str(&source)
        .map_err(|e| CogneeError::InvalidValueError(format!("invalid source id '{source}': {e}")))?;
    let target_id = uuid::Uuid::parse_str(&target)
        .map_err(|e| CogneeError::InvalidValueError(format!("invalid target id '{target}': {e}")))?;

    Ok(Triplet {
        source_node_id: EntityId::from_uuid(source_id),
        relationship_name: rel,
        target_node_id: EntityId::from_uuid(target_id),
        edge_payload: serde_json::to_value(props).unwrap_or(serde_json::Value::Null),
    })
}
