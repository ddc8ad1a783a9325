//! Node Service
//!
//! Business logic for node management.
//!
//! Validation problems never fail a request: they are stored on the node as
//! its validation snapshot (`is_valid`, `validation_errors`) and reported
//! again by executors when the node is run.

use reel_core::domain::node::{Node, NodeMetadata, NodeStatus};
use reel_core::dto::node::{CreateNode, UpdateNode};
use reel_core::validation::ValidationResult;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{NodeRepository, PipelineRepository, Store, StoreError};
use crate::service::validation_service::{self, Definition};

/// Service error type
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node {0} not found")]
    NotFound(Uuid),

    #[error("pipeline {0} not found")]
    PipelineNotFound(Uuid),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("node {0} kept changing while being validated")]
    Conflict(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Validation rounds before an edit racing with other writes gives up
const MAX_EDIT_ATTEMPTS: usize = 5;

/// Create a node in a pipeline
///
/// The node starts `pending` with its validation snapshot computed.
pub async fn create_node(store: &dyn Store, pipeline_id: Uuid, req: CreateNode) -> Result<Node> {
    validate_title(&req.title)?;

    store
        .find_pipeline(pipeline_id)
        .await?
        .ok_or(NodeError::PipelineNotFound(pipeline_id))?;

    let now = chrono::Utc::now();
    let mut node = Node {
        uuid: Uuid::new_v4(),
        pipeline_id,
        title: req.title.trim().to_string(),
        node_type: req.node_type,
        provider: req.provider,
        inputs: req.inputs,
        config: req.config,
        asset: req.asset,
        status: NodeStatus::Pending,
        metadata: NodeMetadata::default(),
        output: None,
        is_valid: false,
        validation_errors: Default::default(),
        created_at: now,
        updated_at: now,
    };

    let validation = validation_service::validate_node(store, &node).await?;
    apply_snapshot(&mut node, validation);

    store.insert_node(&node).await?;

    tracing::info!(
        "Node created: {} ({}, {}) in pipeline {}, valid: {}",
        node.title,
        node.node_type,
        node.uuid,
        pipeline_id,
        node.is_valid
    );

    Ok(node)
}

/// Get a node by UUID
pub async fn get_node(store: &dyn Store, uuid: Uuid) -> Result<Node> {
    let node = store
        .find_node(uuid)
        .await?
        .ok_or(NodeError::NotFound(uuid))?;

    Ok(node)
}

/// List the nodes of a pipeline
pub async fn list_nodes(store: &dyn Store, pipeline_id: Uuid) -> Result<Vec<Node>> {
    store
        .find_pipeline(pipeline_id)
        .await?
        .ok_or(NodeError::PipelineNotFound(pipeline_id))?;

    let nodes = store.list_nodes(pipeline_id).await?;
    Ok(nodes)
}

/// Partially update a node
///
/// Structural changes (provider, inputs, config, asset) re-run validation
/// and put the node back into `pending`. A title-only change keeps status,
/// output and snapshot.
///
/// The snapshot is only saved if the node was not written while it was being
/// validated; otherwise validation runs again on the fresh node.
pub async fn update_node(store: &dyn Store, uuid: Uuid, req: UpdateNode) -> Result<Node> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }

    let structural = req.is_structural();

    for _ in 0..MAX_EDIT_ATTEMPTS {
        let current = get_node(store, uuid).await?;
        let expected = current.updated_at;

        let validation = if structural {
            let mut candidate = current;
            apply_fields(&mut candidate, req.clone());
            Some(validation_service::validate_node(store, &candidate).await?)
        } else {
            None
        };

        let fields = req.clone();
        let update = store
            .update_locked(
                uuid,
                Box::new(move |node: &mut Node| {
                    if let Some(validation) = validation {
                        if node.updated_at != expected {
                            return false;
                        }
                        apply_fields(node, fields);
                        apply_snapshot(node, validation);
                        node.reset_for_edit();
                    } else {
                        apply_fields(node, fields);
                    }
                    true
                }),
            )
            .await?
            .ok_or(NodeError::NotFound(uuid))?;

        if update.applied {
            tracing::info!(
                "Node updated: {} (structural: {}, valid: {})",
                uuid,
                structural,
                update.node.is_valid
            );
            return Ok(update.node);
        }

        tracing::debug!("Node {} changed during validation, validating again", uuid);
    }

    Err(NodeError::Conflict(uuid))
}

/// Recompute and store the validation snapshot without touching status
pub async fn revalidate_node(store: &dyn Store, uuid: Uuid) -> Result<Node> {
    for _ in 0..MAX_EDIT_ATTEMPTS {
        let current = get_node(store, uuid).await?;
        let expected = current.updated_at;
        let validation = validation_service::validate_node(store, &current).await?;

        let update = store
            .update_locked(
                uuid,
                Box::new(move |node: &mut Node| {
                    if node.updated_at != expected {
                        return false;
                    }
                    apply_snapshot(node, validation);
                    true
                }),
            )
            .await?
            .ok_or(NodeError::NotFound(uuid))?;

        if update.applied {
            return Ok(update.node);
        }
    }

    Err(NodeError::Conflict(uuid))
}

/// Delete a node and remove every reference to it from its siblings
///
/// Each sibling that lost a reference is re-validated and reset to `pending`.
pub async fn delete_node(store: &dyn Store, uuid: Uuid) -> Result<()> {
    let node = get_node(store, uuid).await?;

    if !store.delete_node(uuid).await? {
        return Err(NodeError::NotFound(uuid));
    }

    let siblings = store.list_nodes(node.pipeline_id).await?;
    for sibling in siblings {
        if sibling.referenced_uuids().contains(&uuid) {
            strip_sibling_reference(store, sibling.uuid, uuid).await?;
        }
    }

    tracing::info!("Node deleted: {} from pipeline {}", uuid, node.pipeline_id);

    Ok(())
}

async fn strip_sibling_reference(store: &dyn Store, sibling: Uuid, removed: Uuid) -> Result<()> {
    for _ in 0..MAX_EDIT_ATTEMPTS {
        let Some(mut candidate) = store.find_node(sibling).await? else {
            return Ok(());
        };
        let expected = candidate.updated_at;
        if !candidate.strip_reference(removed) {
            return Ok(());
        }
        let validation =
            validation_service::validate_definition(store, Definition::from(&candidate)).await?;

        let update = store
            .update_locked(
                sibling,
                Box::new(move |node: &mut Node| {
                    if node.updated_at != expected || !node.strip_reference(removed) {
                        return false;
                    }
                    apply_snapshot(node, validation);
                    node.reset_for_edit();
                    true
                }),
            )
            .await?;

        match update {
            Some(update) if !update.applied => continue,
            _ => {
                tracing::debug!("Removed reference to {} from node {}", removed, sibling);
                return Ok(());
            }
        }
    }

    Err(NodeError::Conflict(sibling))
}

// =============================================================================
// Helpers
// =============================================================================

fn apply_fields(node: &mut Node, req: UpdateNode) {
    if let Some(title) = req.title {
        node.title = title.trim().to_string();
    }
    if let Some(provider) = req.provider {
        node.provider = provider;
    }
    if let Some(inputs) = req.inputs {
        node.inputs = inputs;
    }
    if let Some(config) = req.config {
        node.config = config;
    }
    if let Some(asset) = req.asset {
        node.asset = asset;
    }
}

fn apply_snapshot(node: &mut Node, validation: ValidationResult) {
    node.is_valid = validation.is_valid;
    node.validation_errors = validation.errors;
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(NodeError::InvalidRequest(
            "Node title cannot be empty".to_string(),
        ));
    }

    if title.chars().count() > 255 {
        return Err(NodeError::InvalidRequest(
            "Node title is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}
