//! Pipeline Repository
//!
//! Handles all storage operations related to pipelines.

use async_trait::async_trait;
use reel_core::domain::pipeline::Pipeline;
use uuid::Uuid;

use super::{PgStore, StoreResult, from_json, to_json};

/// Repository trait for pipeline records
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Inserts a new pipeline
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()>;

    /// Finds a pipeline by ID
    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>>;

    /// Lists all pipelines, newest first
    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>>;

    /// Deletes a pipeline and its nodes, returning whether it existed
    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
impl PipelineRepository for PgStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pipelines (id, title, version, config, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(pipeline.id)
        .bind(&pipeline.title)
        .bind(pipeline.version)
        .bind(to_json(pipeline.id, &pipeline.config)?)
        .bind(to_json(pipeline.id, &pipeline.metadata)?)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, title, version, config, metadata, created_at, updated_at
            FROM pipelines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Pipeline::try_from).transpose()
    }

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, title, version, config, metadata, created_at, updated_at
            FROM pipelines
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Pipeline::try_from).collect()
    }

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool> {
        // Nodes go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    title: String,
    version: i32,
    config: serde_json::Value,
    metadata: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = super::StoreError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        Ok(Pipeline {
            id: row.id,
            title: row.title,
            version: row.version,
            config: from_json(row.id, row.config)?,
            metadata: from_json(row.id, row.metadata)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
