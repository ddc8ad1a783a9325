//! Callback API Handler
//!
//! Ingress for functions that report their result asynchronously.

use axum::{
    Json,
    extract::{Path, State},
};
use reel_core::domain::node::Node;
use reel_core::dto::callback::CallbackPayload;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::callback_service;

/// POST /callback/{uuid}
/// Apply an asynchronous result to a node
///
/// Stale callbacks answer `409 Conflict` and leave the node untouched.
pub async fn receive_callback(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<CallbackPayload>,
) -> ApiResult<Json<Node>> {
    tracing::info!(
        "Callback for node {} from {} executor",
        uuid,
        payload.executor_type
    );

    let node = callback_service::handle_callback(state.store.as_ref(), uuid, payload).await?;

    Ok(Json(node))
}
