//! Node Lifecycle Service
//!
//! The execution state machine: `pending -> in_progress -> {completed, failed}`.
//!
//! Every transition is a single check-and-set on the node record through
//! [`NodeRepository::update_locked`]. The process token issued by [`start`]
//! identifies one attempt; [`succeed`] and [`fail`] only apply while their
//! token is still the current one, so late or duplicate completions of a
//! superseded attempt are dropped.

use chrono::Utc;
use reel_core::domain::node::{Node, NodeOutput, NodeStatus};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{NodeRepository, Store, StoreError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("node {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Result of a guarded transition
#[derive(Debug, Clone)]
pub enum Transition {
    /// The transition was written; holds the updated node
    Applied(Node),
    /// The token no longer matched; holds the node as currently stored
    Stale(Node),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn node(&self) -> &Node {
        match self {
            Transition::Applied(node) | Transition::Stale(node) => node,
        }
    }
}

/// What a successful attempt produced
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCompletion {
    pub output: NodeOutput,
    pub cost: Option<f64>,
}

/// Starts a new execution attempt and returns its process token
///
/// Always applies: a later start supersedes any attempt still running.
pub async fn start(store: &dyn Store, uuid: Uuid) -> Result<(Uuid, Node)> {
    let token = Uuid::new_v4();

    let update = store
        .update_locked(
            uuid,
            Box::new(move |node: &mut Node| {
                let now = Utc::now();
                if node.metadata.started_at.is_some() {
                    node.metadata.retries += 1;
                }
                node.status = NodeStatus::InProgress;
                node.output = None;
                node.metadata.process_uuid = Some(token);
                node.metadata.started_at = Some(now);
                node.metadata.completed_at = None;
                node.metadata.error = None;
                true
            }),
        )
        .await?
        .ok_or(LifecycleError::NotFound(uuid))?;

    tracing::info!(
        "Node started: {} (process {}, retries {})",
        uuid,
        token,
        update.node.metadata.retries
    );

    Ok((token, update.node))
}

/// Completes the attempt identified by `token`
pub async fn succeed(
    store: &dyn Store,
    uuid: Uuid,
    completion: NodeCompletion,
    token: Uuid,
) -> Result<Transition> {
    let update = store
        .update_locked(
            uuid,
            Box::new(move |node: &mut Node| {
                if node.metadata.process_uuid != Some(token) {
                    return false;
                }
                node.status = NodeStatus::Completed;
                node.output = Some(completion.output);
                node.metadata.process_uuid = None;
                node.metadata.completed_at = Some(Utc::now());
                node.metadata.error = None;
                if completion.cost.is_some() {
                    node.metadata.cost = completion.cost;
                }
                true
            }),
        )
        .await?
        .ok_or(LifecycleError::NotFound(uuid))?;

    if update.applied {
        tracing::info!("Node completed: {} (process {})", uuid, token);
        Ok(Transition::Applied(update.node))
    } else {
        tracing::warn!(
            "Ignoring stale success for node {}: process {} is not current ({:?})",
            uuid,
            token,
            update.node.metadata.process_uuid
        );
        Ok(Transition::Stale(update.node))
    }
}

/// Fails the attempt identified by `token`
///
/// With `token == None` the failure always applies; this is how callers
/// record errors that happened before an attempt could be started.
pub async fn fail(
    store: &dyn Store,
    uuid: Uuid,
    message: impl Into<String>,
    token: Option<Uuid>,
) -> Result<Transition> {
    let message = message.into();
    let error = message.clone();

    let update = store
        .update_locked(
            uuid,
            Box::new(move |node: &mut Node| {
                if token.is_some() && node.metadata.process_uuid != token {
                    return false;
                }
                node.status = NodeStatus::Failed;
                node.output = None;
                node.metadata.process_uuid = None;
                node.metadata.completed_at = Some(Utc::now());
                node.metadata.error = Some(error);
                true
            }),
        )
        .await?
        .ok_or(LifecycleError::NotFound(uuid))?;

    if update.applied {
        tracing::error!("Node failed: {}: {}", uuid, message);
        Ok(Transition::Applied(update.node))
    } else {
        tracing::warn!(
            "Ignoring stale failure for node {} (process {:?}): {}",
            uuid,
            token,
            message
        );
        Ok(Transition::Stale(update.node))
    }
}
