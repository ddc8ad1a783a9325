//! Node executors
//!
//! Runs one node: start an attempt, check readiness, build the payload,
//! invoke the node's function and record the outcome.
//!
//! The per-type differences (function name, payload inputs, result mapping)
//! are data driven, so a single [`Executor`] serves every node type. The
//! invocation strategy is whatever [`Invoker`] it was built with.

pub mod output;
pub mod payload;

use reel_core::domain::node::{Node, NodeStatus, NodeType};
use reel_gateway::{GatewayError, Invoker};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{Store, StoreError};
use crate::service::lifecycle_service::{self, LifecycleError, Transition};
use crate::service::validation_service;

/// Function that inspects an uploaded or linked asset
pub const ASSET_FUNCTION: &str = "probe-asset";

/// Errors raised while executing a node
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("node {0} not found")]
    NotFound(Uuid),

    #[error("could not start node {uuid}: {source}")]
    Start {
        uuid: Uuid,
        #[source]
        source: LifecycleError,
    },

    #[error("node is not valid: {0}")]
    Invalid(String),

    #[error("input '{slot}' references node {input}, which does not exist")]
    InputNotFound { slot: String, input: Uuid },

    #[error("input '{slot}' node {input} is not completed (status: {status})")]
    InputNotCompleted {
        slot: String,
        input: Uuid,
        status: NodeStatus,
    },

    #[error("input '{slot}' node {input} completed without an output")]
    InputMissingOutput { slot: String, input: Uuid },

    #[error("asset node has neither an asset descriptor nor a source_url")]
    MissingAsset,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid function result: {0}")]
    InvalidResult(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExecutionError {
    /// Whether the failure happened after an attempt was started
    ///
    /// Failures before start carry no token, so the caller must record them
    /// with an untokened fail.
    pub fn started(&self) -> bool {
        !matches!(self, ExecutionError::NotFound(_) | ExecutionError::Start { .. })
    }
}

/// How an execution ended
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The function returned a result and the node completed
    Completed(Node),
    /// The function accepted the work and will report through a callback
    Deferred { process_uuid: Uuid },
    /// A later attempt took over before this one could record its result
    Superseded,
}

/// Settings shared by every execution
#[derive(Debug, Clone, Default)]
pub struct ExecutorSettings {
    /// Prepended to every function name
    pub function_prefix: String,
    /// Public base URL for asynchronous results
    pub callback_base_url: Option<String>,
}

/// Executes nodes against a store and an invoker
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn Store>,
    invoker: Arc<dyn Invoker>,
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(store: Arc<dyn Store>, invoker: Arc<dyn Invoker>, settings: ExecutorSettings) -> Self {
        Self {
            store,
            invoker,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Name of the function that runs nodes of `kind`
    pub fn function_name(&self, kind: NodeType) -> String {
        let base = match kind {
            NodeType::Asset => ASSET_FUNCTION,
            other => other.as_str(),
        };
        format!("{}{}", self.settings.function_prefix, base)
    }

    fn callback_url(&self, uuid: Uuid) -> Option<String> {
        self.settings
            .callback_base_url
            .as_ref()
            .map(|base| format!("{}/callback/{}", base.trim_end_matches('/'), uuid))
    }

    /// Executes one node
    ///
    /// Any failure after the attempt was started is recorded on the node
    /// with the attempt's token before it is returned.
    pub async fn execute(&self, uuid: Uuid) -> Result<ExecutionOutcome, ExecutionError> {
        let store = self.store.as_ref();

        let (token, node) = match lifecycle_service::start(store, uuid).await {
            Ok(started) => started,
            Err(LifecycleError::NotFound(_)) => return Err(ExecutionError::NotFound(uuid)),
            Err(source) => return Err(ExecutionError::Start { uuid, source }),
        };

        match self.run(&node, token).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!("Execution of node {} failed: {}", uuid, err);
                if let Err(fail_err) =
                    lifecycle_service::fail(store, uuid, err.to_string(), Some(token)).await
                {
                    tracing::error!("Could not record failure of node {}: {}", uuid, fail_err);
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        node: &Node,
        token: Uuid,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let store = self.store.as_ref();

        let validation = validation_service::validate_node(store, node).await?;
        if !validation.is_valid {
            return Err(ExecutionError::Invalid(validation.summary()));
        }
        let kind = node
            .kind()
            .ok_or_else(|| ExecutionError::Invalid(format!("unknown node type '{}'", node.node_type)))?;

        if kind == NodeType::Asset
            && output::asset_location(node.asset.as_ref(), &node.config).is_none()
        {
            return Err(ExecutionError::MissingAsset);
        }

        let inputs = payload::resolve_inputs(store, node).await?;
        let payload = payload::build_payload(node, token, &inputs, self.callback_url(node.uuid));
        let function = self.function_name(kind);

        tracing::debug!(
            "Invoking {} for node {} via {} strategy: {}",
            function,
            node.uuid,
            self.invoker.strategy(),
            payload
        );

        let result = self.invoker.invoke(&function, &payload).await?;

        if output::is_deferred(&result) {
            tracing::info!(
                "Node {} deferred to callback (process {})",
                node.uuid,
                token
            );
            return Ok(ExecutionOutcome::Deferred {
                process_uuid: token,
            });
        }

        let completion = output::map_result(kind, &node.config, node.asset.as_ref(), &result)
            .map_err(ExecutionError::InvalidResult)?;

        match lifecycle_service::succeed(store, node.uuid, completion, token).await? {
            Transition::Applied(node) => Ok(ExecutionOutcome::Completed(node)),
            Transition::Stale(_) => Ok(ExecutionOutcome::Superseded),
        }
    }
}
