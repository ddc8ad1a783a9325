//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use reel_core::domain::node::Node;
use reel_core::domain::pipeline::Pipeline;
use reel_core::dto::node::CreateNode;
use reel_core::dto::pipeline::CreatePipeline;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::{node_service, pipeline_service};

/// POST /pipeline/create
/// Create a new pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    tracing::info!("Creating pipeline: {}", req.title);

    let pipeline = pipeline_service::create_pipeline(state.store.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipeline/list
/// List all pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> ApiResult<Json<Vec<Pipeline>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = pipeline_service::list_pipelines(state.store.as_ref()).await?;

    Ok(Json(pipelines))
}

/// GET /pipeline/{id}
/// Get pipeline by ID
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = pipeline_service::get_pipeline(state.store.as_ref(), id).await?;

    Ok(Json(pipeline))
}

/// DELETE /pipeline/{id}
/// Delete a pipeline and all of its nodes
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    pipeline_service::delete_pipeline(state.store.as_ref(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Pipeline Nodes
// =============================================================================

/// POST /pipeline/{id}/node
/// Create a node in a pipeline
pub async fn create_node(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateNode>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    tracing::info!("Creating {} node in pipeline {}", req.node_type, id);

    let node = node_service::create_node(state.store.as_ref(), id, req).await?;

    Ok((StatusCode::CREATED, Json(node)))
}

/// GET /pipeline/{id}/nodes
/// List the nodes of a pipeline
pub async fn list_nodes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Node>>> {
    tracing::debug!("Listing nodes of pipeline: {}", id);

    let nodes = node_service::list_nodes(state.store.as_ref(), id).await?;

    Ok(Json(nodes))
}
