//! Pipeline Service
//!
//! Business logic for pipeline management.

use reel_core::domain::pipeline::Pipeline;
use reel_core::dto::pipeline::CreatePipeline;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{Store, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Create a new pipeline
pub async fn create_pipeline(store: &dyn Store, req: CreatePipeline) -> Result<Pipeline> {
    validate_pipeline_request(&req)?;

    let now = chrono::Utc::now();
    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        version: req.version,
        config: req.config,
        metadata: req.metadata,
        created_at: now,
        updated_at: now,
    };

    store.insert_pipeline(&pipeline).await?;

    tracing::info!("Pipeline created: {} ({})", pipeline.title, pipeline.id);

    Ok(pipeline)
}

/// Get a pipeline by ID
pub async fn get_pipeline(store: &dyn Store, id: Uuid) -> Result<Pipeline> {
    let pipeline = store
        .find_pipeline(id)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    Ok(pipeline)
}

/// List all pipelines
pub async fn list_pipelines(store: &dyn Store) -> Result<Vec<Pipeline>> {
    let pipelines = store.list_pipelines().await?;
    Ok(pipelines)
}

/// Delete a pipeline together with its nodes
pub async fn delete_pipeline(store: &dyn Store, id: Uuid) -> Result<()> {
    let deleted = store.delete_pipeline(id).await?;

    if !deleted {
        return Err(PipelineError::NotFound(id));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_pipeline_request(req: &CreatePipeline) -> Result<()> {
    if req.title.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "Pipeline title cannot be empty".to_string(),
        ));
    }

    if req.title.chars().count() > 255 {
        return Err(PipelineError::InvalidRequest(
            "Pipeline title is too long (max 255 characters)".to_string(),
        ));
    }

    if req.version < 1 {
        return Err(PipelineError::InvalidRequest(
            "Pipeline version must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryStore, NodeRepository};
    use crate::testing;
    use serde_json::Map;

    fn request(title: &str) -> CreatePipeline {
        CreatePipeline {
            title: title.to_string(),
            version: 1,
            config: Map::new(),
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_pipeline() {
        let store = InMemoryStore::new();
        let created = create_pipeline(&store, request("  Onboarding  ")).await.unwrap();
        assert_eq!(created.title, "Onboarding");

        let fetched = get_pipeline(&store, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(list_pipelines(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let store = InMemoryStore::new();
        let err = create_pipeline(&store, request("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_multibyte_title_within_limit() {
        let store = InMemoryStore::new();
        let created = create_pipeline(&store, request(&"ü".repeat(255))).await.unwrap();
        assert_eq!(created.title.chars().count(), 255);

        let err = create_pipeline(&store, request(&"ü".repeat(256)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_nodes() {
        let store = InMemoryStore::new();
        let pipeline = create_pipeline(&store, request("Teaser")).await.unwrap();
        let asset = testing::completed_asset(&store, pipeline.id, "s3://media/a.mp4").await;

        delete_pipeline(&store, pipeline.id).await.unwrap();

        assert!(store.find_node(asset.uuid).await.unwrap().is_none());
        let err = delete_pipeline(&store, pipeline.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }
}
