//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub title: String,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_version() -> i32 {
    1
}
