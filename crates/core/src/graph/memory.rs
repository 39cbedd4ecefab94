//! In-process [`GraphCollaborator`], used by the retriever test suite in
//! place of a live Neo4j instance — same role `InMemoryVectorStore` plays
//! for `VectorStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use cognee_common::model::{Entity, Event, Triplet};
use cognee_common::{EntityId, EventId, Result};

use super::GraphCollaborator;

#[derive(Default)]
pub struct InMemoryGraphCollaborator {
    triplets: RwLock<Vec<Triplet>>,
    entities: RwLock<Vec<Entity>>,
    events: RwLock<Vec<Event>>,
}

impl InMemoryGraphCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_triplet(&self, triplet: Triplet) {
        self.triplets.write().await.push(triplet);
    }

    pub async fn insert_entity(&self, entity: Entity) {
        self.entities.write().await.push(entity);
    }

    pub async fn insert_event(&self, event: Event) {
        self.events.write().await.push(event);
    }
}

#[async_trait]
impl GraphCollaborator for InMemoryGraphCollaborator {
    async fn neighbors(&self, node_id: EntityId) -> Result<Vec<Triplet>> {
        Ok(self
            .triplets
            .read()
            .await
            .iter()
            .filter(|t| t.source_node_id == node_id || t.target_node_id == node_id)
            .cloned()
            .collect())
    }

    async fn collect_time_ids(
        &self,
        time_from: Option<DateTime<Utc>>,
        time_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventId>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| {
                let Some(occurred_at) = e.occurred_at else {
                    return false;
                };
                time_from.map(|from| occurred_at >= from).unwrap_or(true)
                    && time_to.map(|to| occurred_at <= to).unwrap_or(true)
            })
            .map(|e| e.id)
            .collect())
    }

    async fn collect_events(&self, ids: &[EventId]) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| events.iter().find(|e| e.id == *id).cloned())
            .collect())
    }

    async fn dump_triplets(&self) -> Result<Vec<Triplet>> {
        Ok(self.triplets.read().await.clone())
    }

    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.entities.read().await.iter().find(|e| e.id == id).cloned())
    }
}
