//! Node DTOs

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::domain::node::{AssetDescriptor, NodeConfig, NodeInputs};

/// Request to create a node in a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNode {
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub inputs: NodeInputs,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub asset: Option<AssetDescriptor>,
}

/// Partial update of a node; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNode {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub inputs: Option<NodeInputs>,
    #[serde(default)]
    pub config: Option<NodeConfig>,
    /// `Some(None)` (an explicit `null`) removes the asset descriptor
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub asset: Option<Option<AssetDescriptor>>,
}

/// Tells an explicit `null` apart from an absent field
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateNode {
    /// Whether the update touches anything the execution depends on
    pub fn is_structural(&self) -> bool {
        self.provider.is_some()
            || self.inputs.is_some()
            || self.config.is_some()
            || self.asset.is_some()
    }
}

/// Request to queue a node for execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteNode {
    #[serde(default)]
    pub delay_seconds: Option<u64>,
}

impl ExecuteNode {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds.unwrap_or(0))
    }
}
