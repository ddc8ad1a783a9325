//! Callback Service
//!
//! Applies out-of-band results reported by functions that completed
//! asynchronously.
//!
//! A callback only applies to the attempt that is still current: the node
//! must be `in_progress` with a recorded process token, and when the
//! callback echoes a token it must be that one. Anything else is stale and
//! leaves the node untouched.

use reel_core::domain::node::{Node, NodeStatus, NodeType};
use reel_core::dto::callback::CallbackPayload;
use thiserror::Error;
use uuid::Uuid;

use crate::executor::output;
use crate::repository::{NodeRepository, Store, StoreError};
use crate::service::lifecycle_service::{self, LifecycleError, Transition};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("node {0} not found")]
    NodeNotFound(Uuid),

    #[error("unknown executor type '{0}'")]
    UnknownExecutorType(String),

    #[error("executor type '{executor_type}' does not match node type '{node_type}'")]
    ExecutorMismatch {
        executor_type: String,
        node_type: String,
    },

    #[error("stale callback for node {uuid}: {reason}")]
    Stale { uuid: Uuid, reason: String },

    #[error("callback carries neither a result nor an error")]
    MissingResult,

    #[error("invalid result: {0}")]
    InvalidResult(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CallbackError>;

/// Applies a callback to a node and returns the updated node
pub async fn handle_callback(
    store: &dyn Store,
    uuid: Uuid,
    payload: CallbackPayload,
) -> Result<Node> {
    let node = store
        .find_node(uuid)
        .await?
        .ok_or(CallbackError::NodeNotFound(uuid))?;

    let executor_type: NodeType = payload
        .executor_type
        .parse()
        .map_err(|_| CallbackError::UnknownExecutorType(payload.executor_type.clone()))?;

    if node.kind() != Some(executor_type) {
        return Err(CallbackError::ExecutorMismatch {
            executor_type: payload.executor_type,
            node_type: node.node_type,
        });
    }

    let token = current_token(&node, payload.process_uuid).map_err(|reason| {
        tracing::warn!("Rejecting stale callback for node {}: {}", uuid, reason);
        CallbackError::Stale { uuid, reason }
    })?;

    if let Some(error) = payload.error {
        let message = match payload.error_type {
            Some(error_type) => format!("{}: {}", error_type, error),
            None => error,
        };
        let transition = lifecycle_service::fail(store, uuid, message, Some(token)).await?;
        return applied(uuid, transition);
    }

    let Some(result) = payload.result else {
        lifecycle_service::fail(store, uuid, CallbackError::MissingResult.to_string(), Some(token))
            .await?;
        return Err(CallbackError::MissingResult);
    };

    let completion = match output::map_result(
        executor_type,
        &node.config,
        node.asset.as_ref(),
        &result,
    ) {
        Ok(completion) => completion,
        Err(message) => {
            let err = CallbackError::InvalidResult(message);
            lifecycle_service::fail(store, uuid, err.to_string(), Some(token)).await?;
            return Err(err);
        }
    };

    let transition = lifecycle_service::succeed(store, uuid, completion, token).await?;
    applied(uuid, transition)
}

/// The token the callback applies to, or why it is stale
fn current_token(node: &Node, echoed: Option<Uuid>) -> std::result::Result<Uuid, String> {
    if node.status != NodeStatus::InProgress {
        return Err(format!("node is {}", node.status));
    }

    let Some(current) = node.metadata.process_uuid else {
        return Err("no attempt is in progress".to_string());
    };

    match echoed {
        Some(echoed) if echoed != current => Err(format!(
            "process {} was superseded by {}",
            echoed, current
        )),
        _ => Ok(current),
    }
}

fn applied(uuid: Uuid, transition: Transition) -> Result<Node> {
    match transition {
        Transition::Applied(node) => Ok(node),
        Transition::Stale(_) => Err(CallbackError::Stale {
            uuid,
            reason: "a newer attempt started while the callback was applied".to_string(),
        }),
    }
}
