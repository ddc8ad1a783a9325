//! Test fixtures shared by the orchestrator's unit tests

use async_trait::async_trait;
use reel_core::domain::node::{
    AssetDescriptor, Node, NodeConfig, NodeInputs, NodeMetadata, NodeOutput, NodeStatus,
};
use reel_core::domain::pipeline::Pipeline;
use reel_gateway::{GatewayError, Invoker};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

use crate::repository::{InMemoryStore, NodeRepository, PipelineRepository};

pub async fn pipeline(store: &InMemoryStore) -> Pipeline {
    let now = chrono::Utc::now();
    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        title: "Product launch".to_string(),
        version: 1,
        config: Map::new(),
        metadata: Map::new(),
        created_at: now,
        updated_at: now,
    };
    store.insert_pipeline(&pipeline).await.unwrap();
    pipeline
}

/// An unsaved pending node
pub fn node(pipeline_id: Uuid, node_type: &str, provider: &str) -> Node {
    let now = chrono::Utc::now();
    Node {
        uuid: Uuid::new_v4(),
        pipeline_id,
        title: node_type.to_string(),
        node_type: node_type.to_string(),
        provider: provider.to_string(),
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

/// A stored asset node that already completed with a video output
pub async fn completed_asset(store: &InMemoryStore, pipeline_id: Uuid, location: &str) -> Node {
    let mut asset = node(pipeline_id, "asset", "upload");
    asset
        .config
        .insert("media_type".to_string(), json!("video"));
    asset.asset = Some(AssetDescriptor {
        location: location.to_string(),
        filename: None,
        content_type: Some("video/mp4".to_string()),
        size: None,
    });
    asset.status = NodeStatus::Completed;
    asset.output = Some(NodeOutput {
        media_type: "video".to_string(),
        location: location.to_string(),
        duration: Some(4.0),
        size: None,
        extra: Map::new(),
    });
    store.insert_node(&asset).await.unwrap();
    asset
}

/// Invoker that replays scripted responses and records every call
#[derive(Default)]
pub struct FakeInvoker {
    responses: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<Value, GatewayError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Invoker for FakeInvoker {
    async fn invoke(&self, function: &str, payload: &Value) -> reel_gateway::Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((function.to_string(), payload.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "location": "s3://media/default.mp4" })))
    }

    fn strategy(&self) -> &'static str {
        "fake"
    }
}
