//! Remote invocation strategy
//!
//! Synchronous request/response call to a serverless function endpoint:
//! `POST {base_url}/functions/{name}/invocations` with the JSON payload as
//! body. The endpoint answers with the function's result, or flags a crashed
//! function through the `x-function-error` header.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::response::{normalize, truncate};
use crate::Invoker;

/// Header set by the function runtime when the function itself failed
pub const FUNCTION_ERROR_HEADER: &str = "x-function-error";

/// Invokes functions over HTTP
#[derive(Debug, Clone)]
pub struct RemoteInvoker {
    /// Base URL of the function endpoint (e.g., "http://localhost:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl RemoteInvoker {
    /// Create a new remote invoker with a default HTTP client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a remote invoker whose requests give up after `timeout`
    ///
    /// Functions may legitimately run for minutes (rendering, generation),
    /// so the timeout is expected to be generous.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport {
                function: String::new(),
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a remote invoker with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the function endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn invocation_url(&self, function: &str) -> String {
        format!("{}/functions/{}/invocations", self.base_url, function)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Classify a response into the gateway's failure categories
    async fn handle_response(&self, function: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let function_error = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await.map_err(|e| GatewayError::Transport {
            function: function.to_string(),
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(GatewayError::Transport {
                function: function.to_string(),
                status: Some(status.as_u16()),
                message: format!("status {}: {}", status, truncate(&text, 500)),
            });
        }

        if let Some(kind) = function_error {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| {
                    body.get("errorMessage")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| truncate(&text, 500));
            return Err(GatewayError::Invocation {
                function: function.to_string(),
                message: format!("{}: {}", kind, message),
            });
        }

        let raw: Value = serde_json::from_str(&text).map_err(|e| GatewayError::Parse {
            function: function.to_string(),
            message: format!("{} (body: {})", e, truncate(&text, 200)),
        })?;

        normalize(function, raw)
    }
}

#[async_trait]
impl Invoker for RemoteInvoker {
    async fn invoke(&self, function: &str, payload: &Value) -> Result<Value> {
        let url = self.invocation_url(function);
        tracing::debug!("Invoking remote function {} at {}", function, url);

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                function: function.to_string(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        self.handle_response(function, response).await
    }

    fn strategy(&self) -> &'static str {
        "remote"
    }
}
