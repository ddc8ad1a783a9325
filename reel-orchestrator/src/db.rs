use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            config JSONB NOT NULL DEFAULT '{}',
            metadata JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create nodes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            uuid UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            title VARCHAR(255) NOT NULL,
            node_type VARCHAR(64) NOT NULL,
            provider VARCHAR(64) NOT NULL DEFAULT '',
            inputs JSONB NOT NULL DEFAULT '{}',
            config JSONB NOT NULL DEFAULT '{}',
            asset JSONB,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            metadata JSONB NOT NULL DEFAULT '{}',
            output JSONB,
            is_valid BOOLEAN NOT NULL DEFAULT FALSE,
            validation_errors JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT nodes_status_check
                CHECK (status IN ('pending', 'in_progress', 'completed', 'failed'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_pipeline_id ON nodes(pipeline_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_status ON nodes(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_nodes_process_uuid ON nodes((metadata->>'process_uuid'))",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
