//! Reel Invocation Gateway
//!
//! Calls a named external function with a JSON payload and returns its JSON
//! result, or a typed failure.
//!
//! Two interchangeable strategies implement [`Invoker`]:
//! - [`RemoteInvoker`]: synchronous HTTP request/response to a function endpoint
//! - [`LocalInvoker`]: spawns the function as a local process (development)
//!
//! Both normalize their output the same way, so callers never need to know
//! which strategy is configured.
//!
//! # Example
//!
//! ```no_run
//! use reel_gateway::{Invoker, RemoteInvoker};
//! use serde_json::json;
//!
//! # async fn run() -> reel_gateway::Result<()> {
//! let invoker = RemoteInvoker::new("http://localhost:9000");
//! let result = invoker
//!     .invoke("merge-videos", &json!({ "inputs": { "segments": [] } }))
//!     .await?;
//! println!("output at {}", result["location"]);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod local;
mod remote;
mod response;

pub use error::{GatewayError, Result};
pub use local::LocalInvoker;
pub use remote::{FUNCTION_ERROR_HEADER, RemoteInvoker};

use async_trait::async_trait;
use serde_json::Value;

/// Invoke a named function with a JSON payload
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Calls `function` and waits for its result
    ///
    /// # Arguments
    /// * `function` - Name of the function to run
    /// * `payload` - JSON payload handed to the function
    ///
    /// # Returns
    /// The function's JSON result, with any response envelope removed
    async fn invoke(&self, function: &str, payload: &Value) -> Result<Value>;

    /// Short name of the strategy, for logs
    fn strategy(&self) -> &'static str;
}
