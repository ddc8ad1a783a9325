//! Work queue
//!
//! Runs node executions in the background. Each enqueued node gets its own
//! task: it waits for the requested delay, runs the executor and re-runs it
//! with exponential backoff when the execution fails. Every retry is a fresh
//! start, so it supersedes the attempt that failed.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::executor::{ExecutionError, ExecutionOutcome, Executor};
use crate::service::lifecycle_service;

/// Enqueue node executions
pub trait WorkQueue: Send + Sync {
    /// Schedules an execution of `uuid` after `delay`
    fn enqueue(&self, uuid: Uuid, delay: Duration);
}

/// Retry behaviour of failed executions
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Re-runs after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

/// Work queue backed by tokio tasks
#[derive(Clone)]
pub struct TokioWorkQueue {
    executor: Arc<Executor>,
    policy: RetryPolicy,
}

impl TokioWorkQueue {
    pub fn new(executor: Executor, policy: RetryPolicy) -> Self {
        Self {
            executor: Arc::new(executor),
            policy,
        }
    }

    /// Spawns the execution task of one node
    pub fn spawn(&self, uuid: Uuid, delay: Duration) -> JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let policy = self.policy.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            run_with_retry(&executor, &policy, uuid).await;
        })
    }
}

impl WorkQueue for TokioWorkQueue {
    fn enqueue(&self, uuid: Uuid, delay: Duration) {
        info!("Queued node {} (delay: {:?})", uuid, delay);
        self.spawn(uuid, delay);
    }
}

async fn run_with_retry(executor: &Executor, policy: &RetryPolicy, uuid: Uuid) {
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempt += 1;

        let err = match executor.execute(uuid).await {
            Ok(outcome) => {
                match outcome {
                    ExecutionOutcome::Completed(_) => info!("Node {} completed", uuid),
                    ExecutionOutcome::Deferred { process_uuid } => {
                        info!("Node {} awaiting callback (process {})", uuid, process_uuid)
                    }
                    ExecutionOutcome::Superseded => {
                        info!("Node {} was superseded by a newer attempt", uuid)
                    }
                }
                return;
            }
            Err(err) => err,
        };

        if let ExecutionError::NotFound(_) = err {
            warn!("Dropping execution of node {}: node no longer exists", uuid);
            return;
        }

        if !err.started() {
            if let Err(fail_err) =
                lifecycle_service::fail(executor.store().as_ref(), uuid, err.to_string(), None).await
            {
                error!("Could not record failure of node {}: {}", uuid, fail_err);
            }
        }

        if !should_retry(&err) {
            error!("Node {} failed permanently: {}", uuid, err);
            return;
        }

        if attempt > policy.max_retries {
            error!(
                "Node {} failed after {} attempt(s): {}",
                uuid, attempt, err
            );
            return;
        }

        warn!(
            "Node {} failed (attempt {}/{}): {}",
            uuid,
            attempt,
            policy.max_retries + 1,
            err
        );
        warn!("Retrying node {} in {:?}...", uuid, delay);

        tokio::time::sleep(delay).await;

        // Exponential backoff with cap
        delay = (delay * 2).min(policy.max_delay);
    }
}

/// Failures that another attempt cannot fix without an edit are not retried
fn should_retry(err: &ExecutionError) -> bool {
    !matches!(
        err,
        ExecutionError::NotFound(_)
            | ExecutionError::Invalid(_)
            | ExecutionError::MissingAsset
            | ExecutionError::InvalidResult(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorSettings;
    use crate::repository::{InMemoryStore, NodeRepository};
    use crate::testing::{self, FakeInvoker};
    use reel_core::domain::node::{InputRef, NodeStatus};
    use reel_gateway::GatewayError;
    use serde_json::json;

    fn queue(store: &InMemoryStore, invoker: Arc<FakeInvoker>, max_retries: u32) -> TokioWorkQueue {
        let executor = Executor::new(
            Arc::new(store.clone()),
            invoker,
            ExecutorSettings::default(),
        );
        TokioWorkQueue::new(
            executor,
            RetryPolicy {
                max_retries,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
            },
        )
    }

    async fn merge_node(store: &InMemoryStore) -> Uuid {
        let pipeline = testing::pipeline(store).await;
        let a = testing::completed_asset(store, pipeline.id, "s3://media/a.mp4").await;
        let b = testing::completed_asset(store, pipeline.id, "s3://media/b.mp4").await;
        let mut merge = testing::node(pipeline.id, "merge-videos", "ffmpeg");
        merge
            .inputs
            .insert("segments".to_string(), InputRef::Many(vec![a.uuid, b.uuid]));
        store.insert_node(&merge).await.unwrap();
        merge.uuid
    }

    fn transport_error() -> GatewayError {
        GatewayError::Transport {
            function: "merge-videos".to_string(),
            status: Some(503),
            message: "service unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let store = InMemoryStore::new();
        let merge = merge_node(&store).await;
        let invoker = Arc::new(
            FakeInvoker::new()
                .respond(Err(transport_error()))
                .respond(Ok(json!({ "location": "s3://media/merged.mp4" }))),
        );

        queue(&store, invoker.clone(), 3)
            .spawn(merge, Duration::ZERO)
            .await
            .unwrap();

        let stored = store.find_node(merge).await.unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::Completed);
        assert_eq!(stored.metadata.retries, 1);
        assert_eq!(invoker.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let store = InMemoryStore::new();
        let merge = merge_node(&store).await;
        let invoker = Arc::new(
            FakeInvoker::new()
                .respond(Err(transport_error()))
                .respond(Err(transport_error()))
                .respond(Err(transport_error())),
        );

        queue(&store, invoker.clone(), 2)
            .spawn(merge, Duration::ZERO)
            .await
            .unwrap();

        let stored = store.find_node(merge).await.unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::Failed);
        assert_eq!(invoker.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_node_is_not_retried() {
        let store = InMemoryStore::new();
        let pipeline = testing::pipeline(&store).await;
        let merge = testing::node(pipeline.id, "merge-videos", "ffmpeg");
        store.insert_node(&merge).await.unwrap();

        let invoker = Arc::new(FakeInvoker::new());
        queue(&store, invoker.clone(), 3)
            .spawn(merge.uuid, Duration::ZERO)
            .await
            .unwrap();

        let stored = store.find_node(merge.uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::Failed);
        assert_eq!(stored.metadata.retries, 0);
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_result_is_not_retried() {
        let store = InMemoryStore::new();
        let merge = merge_node(&store).await;
        let invoker = Arc::new(
            FakeInvoker::new()
                .respond(Ok(json!({ "duration": 8.0 })))
                .respond(Ok(json!({ "location": "s3://media/merged.mp4" }))),
        );

        queue(&store, invoker.clone(), 3)
            .spawn(merge, Duration::ZERO)
            .await
            .unwrap();

        let stored = store.find_node(merge).await.unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::Failed);
        assert!(stored.metadata.error.unwrap().contains("no output location"));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_node_is_dropped() {
        let store = InMemoryStore::new();
        let invoker = Arc::new(FakeInvoker::new());
        queue(&store, invoker.clone(), 3)
            .spawn(Uuid::new_v4(), Duration::ZERO)
            .await
            .unwrap();
        assert!(invoker.calls().is_empty());
    }
}
