//! Pipeline domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Pipeline definition
///
/// Owns a set of nodes; deleting a pipeline deletes its nodes. The
/// `metadata` holds aggregate counters (cost, progress) maintained outside
/// of the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub title: String,
    pub version: i32,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
