//! Error types for the invocation gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur when invoking a function
///
/// Both strategies report the same three failure categories: the call never
/// produced a usable response (`Transport`), the function itself crashed or
/// was rejected by its runtime (`Invocation`), or the function ran and
/// reported an error in its result (`Application`).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request/response exchange failed or returned a non-success status
    #[error("transport failure invoking '{function}': {message}")]
    Transport {
        function: String,
        /// HTTP status, when a response was received at all
        status: Option<u16>,
        message: String,
    },

    /// The function did not run to completion
    #[error("function '{function}' failed during invocation: {message}")]
    Invocation { function: String, message: String },

    /// The function completed and reported an error in its result
    #[error("function '{function}' returned an error: {message}")]
    Application {
        function: String,
        error_type: Option<String>,
        message: String,
    },

    /// The function's output was not valid JSON
    #[error("failed to parse result of '{function}': {message}")]
    Parse { function: String, message: String },

    /// No runnable unit is registered under the function name
    #[error("function '{function}' not found: {message}")]
    NotFound { function: String, message: String },

    /// The local process could not be started
    #[error("failed to spawn function '{function}': {source}")]
    Spawn {
        function: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Name of the function whose invocation failed
    pub fn function(&self) -> &str {
        match self {
            Self::Transport { function, .. }
            | Self::Invocation { function, .. }
            | Self::Application { function, .. }
            | Self::Parse { function, .. }
            | Self::NotFound { function, .. }
            | Self::Spawn { function, .. } => function,
        }
    }

    /// Check if the function itself reported the failure
    pub fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Check if this error happened before the function produced a result
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Spawn { .. })
    }
}
