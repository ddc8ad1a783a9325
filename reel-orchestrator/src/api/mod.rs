//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod callback;
pub mod error;
pub mod health;
pub mod node;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::queue::WorkQueue;
use crate::repository::Store;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn WorkQueue>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/create", post(pipeline::create_pipeline))
        .route("/pipeline/list", get(pipeline::list_pipelines))
        .route(
            "/pipeline/{id}",
            get(pipeline::get_pipeline).delete(pipeline::delete_pipeline),
        )
        .route("/pipeline/{id}/node", post(pipeline::create_node))
        .route("/pipeline/{id}/nodes", get(pipeline::list_nodes))
        // Node endpoints
        .route(
            "/node/{uuid}",
            get(node::get_node)
                .patch(node::update_node)
                .delete(node::delete_node),
        )
        .route("/node/{uuid}/validate", post(node::validate_node))
        .route("/node/{uuid}/execute", post(node::execute_node))
        // Callback ingress
        .route("/callback/{uuid}", post(callback::receive_callback))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use crate::service::lifecycle_service;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::util::ServiceExt;
    use uuid::Uuid;

    /// Queue that only records what was enqueued
    #[derive(Default)]
    struct RecordingQueue {
        enqueued: Mutex<Vec<(Uuid, Duration)>>,
    }

    impl WorkQueue for RecordingQueue {
        fn enqueue(&self, uuid: Uuid, delay: Duration) {
            self.enqueued.lock().unwrap().push((uuid, delay));
        }
    }

    fn app(store: &InMemoryStore, queue: Arc<RecordingQueue>) -> Router {
        create_router(AppState {
            store: Arc::new(store.clone()),
            queue,
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(&InMemoryStore::new(), Arc::default());
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_pipeline_and_node_flow() {
        let store = InMemoryStore::new();
        let queue = Arc::new(RecordingQueue::default());
        let app = app(&store, queue.clone());

        let (status, pipeline) = call(
            &app,
            "POST",
            "/pipeline/create",
            Some(json!({ "title": "Explainer" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let pipeline_id = pipeline["id"].as_str().unwrap().to_string();

        let (status, node) = call(
            &app,
            "POST",
            &format!("/pipeline/{}/node", pipeline_id),
            Some(json!({
                "title": "Narration",
                "type": "generate-voiceover",
                "provider": "openai",
                "config": { "text": "Hello", "voice": "nova" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(node["status"], "pending");
        assert_eq!(node["is_valid"], true);
        let node_uuid = node["uuid"].as_str().unwrap().to_string();

        let (status, node) = call(
            &app,
            "PATCH",
            &format!("/node/{}", node_uuid),
            Some(json!({ "config": { "text": "Hello", "voice": "robot" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(node["is_valid"], false);
        assert!(node["validation_errors"]["voice"][0]
            .as_str()
            .unwrap()
            .starts_with("must be one of"));

        let (status, nodes) =
            call(&app, "GET", &format!("/pipeline/{}/nodes", pipeline_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nodes.as_array().unwrap().len(), 1);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/node/{}/execute", node_uuid),
            Some(json!({ "delay_seconds": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let enqueued = queue.enqueued.lock().unwrap().clone();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].0.to_string(), node_uuid);
        assert_eq!(enqueued[0].1, Duration::from_secs(30));

        let (status, _) = call(&app, "DELETE", &format!("/pipeline/{}", pipeline_id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, "GET", &format!("/node/{}", node_uuid), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_execute_without_body_and_unknown_node() {
        let store = InMemoryStore::new();
        let queue = Arc::new(RecordingQueue::default());
        let app = app(&store, queue.clone());
        let pipeline = crate::testing::pipeline(&store).await;
        let asset = crate::testing::completed_asset(&store, pipeline.id, "s3://a.mp4").await;

        let (status, _) = call(&app, "POST", &format!("/node/{}/execute", asset.uuid), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(queue.enqueued.lock().unwrap()[0].1, Duration::ZERO);

        let (status, _) =
            call(&app, "POST", &format!("/node/{}/execute", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stale_callback_is_conflict() {
        let store = InMemoryStore::new();
        let app = app(&store, Arc::default());
        let pipeline = crate::testing::pipeline(&store).await;
        let asset = crate::testing::completed_asset(&store, pipeline.id, "s3://a.mp4").await;

        let (first, _) = lifecycle_service::start(&store, asset.uuid).await.unwrap();
        let (second, _) = lifecycle_service::start(&store, asset.uuid).await.unwrap();
        let uri = format!("/callback/{}", asset.uuid);

        let (status, body) = call(
            &app,
            "POST",
            &uri,
            Some(json!({
                "executor_type": "asset",
                "process_uuid": first,
                "result": { "location": "s3://stale.mp4" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("stale"));

        let (status, node) = call(
            &app,
            "POST",
            &uri,
            Some(json!({
                "executor_type": "asset",
                "process_uuid": second,
                "result": { "location": "s3://fresh.mp4" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(node["status"], "completed");
        assert_eq!(node["output"]["location"], "s3://fresh.mp4");
    }
}
