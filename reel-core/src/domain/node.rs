//! Node domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Slot name -> reference(s) to other nodes of the same pipeline
pub type NodeInputs = BTreeMap<String, InputRef>;

/// Provider-specific configuration fields
pub type NodeConfig = Map<String, Value>;

/// Field/slot name -> validation messages
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// A single unit of work in a media pipeline
///
/// Structure shared between orchestrator (persists) and executors (run).
/// The `node_type` is kept as the raw tag so that an unknown type surfaces
/// as a validation failure instead of a decoding error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    pub pipeline_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub provider: String,
    #[serde(default)]
    pub inputs: NodeInputs,
    #[serde(default)]
    pub config: NodeConfig,
    pub asset: Option<AssetDescriptor>,
    pub status: NodeStatus,
    #[serde(default)]
    pub metadata: NodeMetadata,
    pub output: Option<NodeOutput>,
    pub is_valid: bool,
    #[serde(default)]
    pub validation_errors: ValidationErrors,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Parsed node type, `None` when the stored tag is not a known type
    pub fn kind(&self) -> Option<NodeType> {
        self.node_type.parse().ok()
    }

    /// Every node UUID referenced by any input slot, in slot order
    pub fn referenced_uuids(&self) -> Vec<Uuid> {
        referenced_uuids(&self.inputs)
    }

    /// Removes every reference to `uuid` from the inputs
    ///
    /// List slots lose only the matching element; a single-reference slot
    /// pointing at `uuid` is removed entirely. Returns whether anything changed.
    pub fn strip_reference(&mut self, uuid: Uuid) -> bool {
        let mut changed = false;

        self.inputs.retain(|_, value| match value {
            InputRef::One(id) if *id == uuid => {
                changed = true;
                false
            }
            InputRef::One(_) => true,
            InputRef::Many(ids) => {
                let before = ids.len();
                ids.retain(|id| *id != uuid);
                changed |= ids.len() != before;
                true
            }
        });

        changed
    }

    /// Puts the node back into `pending` after a structural edit
    ///
    /// Any output or attempt from a previous execution no longer matches
    /// the node's definition, so both are discarded.
    pub fn reset_for_edit(&mut self) {
        self.status = NodeStatus::Pending;
        self.output = None;
        self.metadata.process_uuid = None;
        self.metadata.error = None;
        self.metadata.completed_at = None;
    }
}

/// Collects every node UUID referenced by the given inputs, in slot order
pub fn referenced_uuids(inputs: &NodeInputs) -> Vec<Uuid> {
    let mut uuids = Vec::new();
    for value in inputs.values() {
        for id in value.uuids() {
            if !uuids.contains(id) {
                uuids.push(*id);
            }
        }
    }
    uuids
}

/// Value of an input slot: one reference or an ordered list of references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputRef {
    One(Uuid),
    Many(Vec<Uuid>),
}

impl InputRef {
    /// The referenced UUIDs, preserving list order
    pub fn uuids(&self) -> &[Uuid] {
        match self {
            InputRef::One(id) => std::slice::from_ref(id),
            InputRef::Many(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, InputRef::Many(ids) if ids.is_empty())
    }
}

/// The fixed set of node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Asset,
    GenerateTalkingHead,
    GenerateAnimation,
    GenerateVoiceover,
    RenderCode,
    MixAudio,
    MergeVideos,
    ComposeVideo,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Asset,
        NodeType::GenerateTalkingHead,
        NodeType::GenerateAnimation,
        NodeType::GenerateVoiceover,
        NodeType::RenderCode,
        NodeType::MixAudio,
        NodeType::MergeVideos,
        NodeType::ComposeVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Asset => "asset",
            NodeType::GenerateTalkingHead => "generate-talking-head",
            NodeType::GenerateAnimation => "generate-animation",
            NodeType::GenerateVoiceover => "generate-voiceover",
            NodeType::RenderCode => "render-code",
            NodeType::MixAudio => "mix-audio",
            NodeType::MergeVideos => "merge-videos",
            NodeType::ComposeVideo => "compose-video",
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node type '{}'", s))
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::InProgress => "in_progress",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NodeStatus::Pending),
            "in_progress" => Ok(NodeStatus::InProgress),
            "completed" => Ok(NodeStatus::Completed),
            "failed" => Ok(NodeStatus::Failed),
            other => Err(format!("unknown node status '{}'", other)),
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Correlation token of the current execution attempt
    pub process_uuid: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cost: Option<f64>,
    #[serde(default)]
    pub retries: u32,
    pub error: Option<String>,
}

/// Result descriptor of a completed node
///
/// The storage locator is opaque; it is only passed through to downstream
/// nodes and checked for presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(rename = "type")]
    pub media_type: String,
    pub location: String,
    pub duration: Option<f64>,
    pub size: Option<u64>,
    /// Type-specific extras reported by the function
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl NodeOutput {
    /// An output is usable downstream only when it carries a locator
    pub fn is_usable(&self) -> bool {
        !self.location.trim().is_empty()
    }
}

/// Direct payload descriptor for source ("asset") nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Locator of the externally stored object
    pub location: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}
