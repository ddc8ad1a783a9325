//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::repository::StoreError;
use crate::service::callback_service::CallbackError;
use crate::service::lifecycle_service::LifecycleError;
use crate::service::node_service::NodeError;
use crate::service::pipeline_service::PipelineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    StoreError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreError(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(id) => ApiError::NotFound(format!("Pipeline {} not found", id)),
            PipelineError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            PipelineError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NotFound(uuid) => ApiError::NotFound(format!("Node {} not found", uuid)),
            NodeError::PipelineNotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            NodeError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            err @ NodeError::Conflict(_) => ApiError::Conflict(err.to_string()),
            NodeError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(uuid) => ApiError::NotFound(format!("Node {} not found", uuid)),
            LifecycleError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<CallbackError> for ApiError {
    fn from(err: CallbackError) -> Self {
        let message = err.to_string();
        match err {
            CallbackError::NodeNotFound(uuid) => {
                ApiError::NotFound(format!("Node {} not found", uuid))
            }
            CallbackError::Stale { .. } => ApiError::Conflict(message),
            CallbackError::UnknownExecutorType(_)
            | CallbackError::ExecutorMismatch { .. }
            | CallbackError::MissingResult
            | CallbackError::InvalidResult(_) => ApiError::BadRequest(message),
            CallbackError::Lifecycle(err) => err.into(),
            CallbackError::Store(err) => ApiError::StoreError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
