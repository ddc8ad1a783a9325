//! In-memory store
//!
//! Keeps pipelines and nodes in process memory behind a single async lock.
//! Used by tests and by local runs that do not need persistence.

use async_trait::async_trait;
use reel_core::domain::node::Node;
use reel_core::domain::pipeline::Pipeline;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{LockedUpdate, NodeMutation, NodeRepository, PipelineRepository, StoreResult};

#[derive(Default)]
struct State {
    pipelines: HashMap<Uuid, Pipeline>,
    nodes: HashMap<Uuid, Node>,
}

/// In-memory implementation of both repositories
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineRepository for InMemoryStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.pipelines.insert(pipeline.id, pipeline.clone());
        Ok(())
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>> {
        let state = self.state.lock().await;
        Ok(state.pipelines.get(&id).cloned())
    }

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let state = self.state.lock().await;
        let mut pipelines: Vec<Pipeline> = state.pipelines.values().cloned().collect();
        pipelines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pipelines)
    }

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.pipelines.remove(&id).is_none() {
            return Ok(false);
        }
        state.nodes.retain(|_, node| node.pipeline_id != id);
        Ok(true)
    }
}

#[async_trait]
impl NodeRepository for InMemoryStore {
    async fn insert_node(&self, node: &Node) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.nodes.insert(node.uuid, node.clone());
        Ok(())
    }

    async fn find_node(&self, uuid: Uuid) -> StoreResult<Option<Node>> {
        let state = self.state.lock().await;
        Ok(state.nodes.get(&uuid).cloned())
    }

    async fn delete_node(&self, uuid: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state.nodes.remove(&uuid).is_some())
    }

    async fn list_nodes(&self, pipeline_id: Uuid) -> StoreResult<Vec<Node>> {
        let state = self.state.lock().await;
        let mut nodes: Vec<Node> = state
            .nodes
            .values()
            .filter(|node| node.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(nodes)
    }

    async fn find_nodes_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<Vec<Node>> {
        let state = self.state.lock().await;
        Ok(uuids
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .filter(|node| node.pipeline_id == pipeline_id)
            .cloned()
            .collect())
    }

    async fn existing_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let state = self.state.lock().await;
        Ok(uuids
            .iter()
            .filter(|id| {
                state
                    .nodes
                    .get(id)
                    .is_some_and(|node| node.pipeline_id == pipeline_id)
            })
            .copied()
            .collect())
    }

    async fn update_locked(
        &self,
        uuid: Uuid,
        mutation: NodeMutation,
    ) -> StoreResult<Option<LockedUpdate>> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.nodes.get_mut(&uuid) else {
            return Ok(None);
        };

        let mut node = stored.clone();
        if !mutation(&mut node) {
            return Ok(Some(LockedUpdate {
                node: stored.clone(),
                applied: false,
            }));
        }

        node.updated_at = chrono::Utc::now();
        *stored = node.clone();

        Ok(Some(LockedUpdate {
            node,
            applied: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::domain::node::{NodeConfig, NodeInputs, NodeMetadata, NodeStatus};
    use serde_json::Map;

    fn pipeline() -> Pipeline {
        let now = chrono::Utc::now();
        Pipeline {
            id: Uuid::new_v4(),
            title: "Launch video".to_string(),
            version: 1,
            config: Map::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn node(pipeline_id: Uuid) -> Node {
        let now = chrono::Utc::now();
        Node {
            uuid: Uuid::new_v4(),
            pipeline_id,
            title: "Voiceover".to_string(),
            node_type: "generate-voiceover".to_string(),
            provider: "elevenlabs".to_string(),
            inputs: NodeInputs::new(),
            config: NodeConfig::new(),
            asset: None,
            status: NodeStatus::Pending,
            metadata: NodeMetadata::default(),
            output: None,
            is_valid: true,
            validation_errors: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_deleting_pipeline_removes_its_nodes() {
        let store = InMemoryStore::new();
        let kept = pipeline();
        let removed = pipeline();
        store.insert_pipeline(&kept).await.unwrap();
        store.insert_pipeline(&removed).await.unwrap();

        let kept_node = node(kept.id);
        store.insert_node(&kept_node).await.unwrap();
        store.insert_node(&node(removed.id)).await.unwrap();

        assert!(store.delete_pipeline(removed.id).await.unwrap());
        assert!(!store.delete_pipeline(removed.id).await.unwrap());
        assert!(store.list_nodes(removed.id).await.unwrap().is_empty());
        assert_eq!(store.list_nodes(kept.id).await.unwrap().len(), 1);
        assert!(store.find_node(kept_node.uuid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_existing_in_pipeline_ignores_other_pipelines() {
        let store = InMemoryStore::new();
        let first = node(Uuid::new_v4());
        let second = node(Uuid::new_v4());
        store.insert_node(&first).await.unwrap();
        store.insert_node(&second).await.unwrap();

        let missing = Uuid::new_v4();
        let found = store
            .existing_in_pipeline(first.pipeline_id, &[first.uuid, second.uuid, missing])
            .await
            .unwrap();

        assert_eq!(found, HashSet::from([first.uuid]));
    }

    #[tokio::test]
    async fn test_update_locked_skips_write_when_not_applied() {
        let store = InMemoryStore::new();
        let original = node(Uuid::new_v4());
        store.insert_node(&original).await.unwrap();

        let update = store
            .update_locked(
                original.uuid,
                Box::new(|node: &mut Node| {
                    node.title = "ignored".to_string();
                    false
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(!update.applied);
        assert_eq!(update.node.title, "Voiceover");
        let stored = store.find_node(original.uuid).await.unwrap().unwrap();
        assert_eq!(stored.title, "Voiceover");
    }

    #[tokio::test]
    async fn test_update_locked_saves_applied_mutation() {
        let store = InMemoryStore::new();
        let original = node(Uuid::new_v4());
        store.insert_node(&original).await.unwrap();

        let update = store
            .update_locked(
                original.uuid,
                Box::new(|node: &mut Node| {
                    node.status = NodeStatus::InProgress;
                    true
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(update.applied);
        let stored = store.find_node(original.uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_locked_missing_node() {
        let store = InMemoryStore::new();
        let update = store
            .update_locked(Uuid::new_v4(), Box::new(|_: &mut Node| true))
            .await
            .unwrap();
        assert!(update.is_none());
    }
}
