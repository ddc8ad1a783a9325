//! Callback DTOs
//!
//! Out-of-band completion notice for an invocation whose function reports
//! its result asynchronously instead of returning it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Completion notice posted by a function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// Type tag of the executor that issued the invocation
    pub executor_type: String,
    /// Token of the attempt the notice belongs to, when the function echoes it
    #[serde(default)]
    pub process_uuid: Option<Uuid>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}
