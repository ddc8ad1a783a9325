//! Node API Handlers
//!
//! HTTP endpoints for node management and execution.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use reel_core::domain::node::Node;
use reel_core::dto::node::{ExecuteNode, UpdateNode};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::node_service;

/// GET /node/{uuid}
/// Get node details by UUID
pub async fn get_node(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<Node>> {
    tracing::debug!("Getting node: {}", uuid);

    let node = node_service::get_node(state.store.as_ref(), uuid).await?;

    Ok(Json(node))
}

/// PATCH /node/{uuid}
/// Partially update a node
pub async fn update_node(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(req): Json<UpdateNode>,
) -> ApiResult<Json<Node>> {
    tracing::info!("Updating node: {}", uuid);

    let node = node_service::update_node(state.store.as_ref(), uuid, req).await?;

    Ok(Json(node))
}

/// DELETE /node/{uuid}
/// Delete a node and remove references to it
pub async fn delete_node(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting node: {}", uuid);

    node_service::delete_node(state.store.as_ref(), uuid).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /node/{uuid}/validate
/// Recompute the validation snapshot of a node
pub async fn validate_node(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<Node>> {
    tracing::debug!("Validating node: {}", uuid);

    let node = node_service::revalidate_node(state.store.as_ref(), uuid).await?;

    Ok(Json(node))
}

/// POST /node/{uuid}/execute
/// Queue a node for execution
///
/// The body is optional; `{"delay_seconds": n}` postpones the execution.
pub async fn execute_node(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    body: Option<Json<ExecuteNode>>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let node = node_service::get_node(state.store.as_ref(), uuid).await?;

    state.queue.enqueue(node.uuid, req.delay());

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "node_uuid": node.uuid,
            "queued": true,
            "delay_seconds": req.delay().as_secs(),
        })),
    ))
}
