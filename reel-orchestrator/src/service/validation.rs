//! Validation Service
//!
//! Runs the schema validator against stored pipeline state: one batch
//! existence query for every referenced UUID, plus reference cycle rejection.

use reel_core::domain::node::{Node, NodeConfig, NodeInputs, referenced_uuids};
use reel_core::graph::ReferenceGraph;
use reel_core::validation::{self, ValidationResult};
use uuid::Uuid;

use crate::repository::{NodeRepository, Store, StoreResult};

pub const CYCLE_MESSAGE: &str = "would create a reference cycle";

/// Candidate definition of a node, stored or not
pub struct Definition<'a> {
    pub uuid: Uuid,
    pub pipeline_id: Uuid,
    pub node_type: &'a str,
    pub provider: &'a str,
    pub inputs: &'a NodeInputs,
    pub config: &'a NodeConfig,
}

impl<'a> From<&'a Node> for Definition<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            uuid: node.uuid,
            pipeline_id: node.pipeline_id,
            node_type: &node.node_type,
            provider: &node.provider,
            inputs: &node.inputs,
            config: &node.config,
        }
    }
}

/// Validates a node definition against the current state of its pipeline
pub async fn validate_definition(
    store: &dyn Store,
    definition: Definition<'_>,
) -> StoreResult<ValidationResult> {
    let referenced = referenced_uuids(definition.inputs);
    let existing = store
        .existing_in_pipeline(definition.pipeline_id, &referenced)
        .await?;

    let mut result = validation::validate(
        definition.node_type,
        definition.provider,
        definition.inputs,
        definition.config,
        &existing,
    );

    if !referenced.is_empty() {
        let nodes = store.list_nodes(definition.pipeline_id).await?;
        let graph = ReferenceGraph::from_nodes(&nodes);
        for slot in graph.cyclic_slots(definition.uuid, definition.inputs) {
            result.add(slot, CYCLE_MESSAGE);
        }
    }

    Ok(result)
}

/// Validates a stored node
pub async fn validate_node(store: &dyn Store, node: &Node) -> StoreResult<ValidationResult> {
    validate_definition(store, Definition::from(node)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use crate::testing;
    use reel_core::domain::node::InputRef;

    #[tokio::test]
    async fn test_missing_references_are_reported_per_slot() {
        let store = InMemoryStore::new();
        let pipeline = testing::pipeline(&store).await;
        let segment = testing::completed_asset(&store, pipeline.id, "s3://media/a.mp4").await;

        let ghost = Uuid::new_v4();
        let mut merge = testing::node(pipeline.id, "merge-videos", "ffmpeg");
        merge.inputs.insert(
            "segments".to_string(),
            InputRef::Many(vec![segment.uuid, ghost]),
        );

        let result = validate_node(&store, &merge).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(
            result.messages("segments"),
            [format!("references non-existent node(s): {}", ghost)]
        );
    }

    #[tokio::test]
    async fn test_self_reference_is_a_cycle() {
        let store = InMemoryStore::new();
        let pipeline = testing::pipeline(&store).await;
        let mut animation = testing::node(pipeline.id, "generate-animation", "runway");
        animation
            .config
            .insert("prompt".to_string(), serde_json::json!("a sunrise"));
        store.insert_node(&animation).await.unwrap();

        animation
            .inputs
            .insert("reference".to_string(), InputRef::One(animation.uuid));

        let result = validate_node(&store, &animation).await.unwrap();
        assert_eq!(result.messages("reference"), [CYCLE_MESSAGE]);
    }

    #[tokio::test]
    async fn test_indirect_cycle_is_rejected() {
        let store = InMemoryStore::new();
        let pipeline = testing::pipeline(&store).await;

        let mut first = testing::node(pipeline.id, "merge-videos", "ffmpeg");
        let mut second = testing::node(pipeline.id, "merge-videos", "ffmpeg");
        let asset = testing::completed_asset(&store, pipeline.id, "s3://media/a.mp4").await;

        second.inputs.insert(
            "segments".to_string(),
            InputRef::Many(vec![asset.uuid, first.uuid]),
        );
        store.insert_node(&first).await.unwrap();
        store.insert_node(&second).await.unwrap();

        first.inputs.insert(
            "segments".to_string(),
            InputRef::Many(vec![asset.uuid, second.uuid]),
        );

        let result = validate_node(&store, &first).await.unwrap();
        assert_eq!(result.messages("segments"), [CYCLE_MESSAGE]);
    }
}
