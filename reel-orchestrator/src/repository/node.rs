//! Node Repository
//!
//! Handles all storage operations related to nodes.
//!
//! After insertion a node record is only ever written through
//! [`NodeRepository::update_locked`], which loads the row under an exclusive
//! lock, applies a mutation and saves it in one transaction. This is the
//! compare-and-set primitive the execution lifecycle relies on.

use async_trait::async_trait;
use reel_core::domain::node::{Node, NodeStatus};
use sqlx::{PgExecutor, Postgres};
use std::collections::HashSet;
use uuid::Uuid;

use super::{PgStore, StoreError, StoreResult, from_json, to_json};

/// Mutation applied to a locked node; returns whether the node must be saved
pub type NodeMutation = Box<dyn FnOnce(&mut Node) -> bool + Send>;

/// Outcome of a locked update
#[derive(Debug, Clone)]
pub struct LockedUpdate {
    /// The node as stored after the update
    pub node: Node,
    /// Whether the mutation asked for the change to be saved
    pub applied: bool,
}

/// Repository trait for node records
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Inserts a new node
    async fn insert_node(&self, node: &Node) -> StoreResult<()>;

    /// Finds a node by UUID
    async fn find_node(&self, uuid: Uuid) -> StoreResult<Option<Node>>;

    /// Deletes a node, returning whether it existed
    async fn delete_node(&self, uuid: Uuid) -> StoreResult<bool>;

    /// Lists the nodes of a pipeline, oldest first
    async fn list_nodes(&self, pipeline_id: Uuid) -> StoreResult<Vec<Node>>;

    /// Loads the given nodes, restricted to one pipeline
    async fn find_nodes_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<Vec<Node>>;

    /// Which of `uuids` exist in the pipeline
    async fn existing_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>>;

    /// Loads the node under an exclusive lock, applies `mutation` and saves it
    ///
    /// Returns `None` when the node does not exist. When the mutation
    /// returns `false` nothing is written and the unmodified node is returned.
    async fn update_locked(
        &self,
        uuid: Uuid,
        mutation: NodeMutation,
    ) -> StoreResult<Option<LockedUpdate>>;
}

#[async_trait]
impl NodeRepository for PgStore {
    async fn insert_node(&self, node: &Node) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO nodes (
                uuid, pipeline_id, title, node_type, provider, inputs, config, asset,
                status, metadata, output, is_valid, validation_errors, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(node.uuid)
        .bind(node.pipeline_id)
        .bind(&node.title)
        .bind(&node.node_type)
        .bind(&node.provider)
        .bind(to_json(node.uuid, &node.inputs)?)
        .bind(to_json(node.uuid, &node.config)?)
        .bind(optional_json(node.uuid, node.asset.as_ref())?)
        .bind(node.status.as_str())
        .bind(to_json(node.uuid, &node.metadata)?)
        .bind(optional_json(node.uuid, node.output.as_ref())?)
        .bind(node.is_valid)
        .bind(to_json(node.uuid, &node.validation_errors)?)
        .bind(node.created_at)
        .bind(node.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_node(&self, uuid: Uuid) -> StoreResult<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT uuid, pipeline_id, title, node_type, provider, inputs, config, asset,
                   status, metadata, output, is_valid, validation_errors, created_at, updated_at
            FROM nodes
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Node::try_from).transpose()
    }

    async fn delete_node(&self, uuid: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_nodes(&self, pipeline_id: Uuid) -> StoreResult<Vec<Node>> {
        let rows = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT uuid, pipeline_id, title, node_type, provider, inputs, config, asset,
                   status, metadata, output, is_valid, validation_errors, created_at, updated_at
            FROM nodes
            WHERE pipeline_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Node::try_from).collect()
    }

    async fn find_nodes_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<Vec<Node>> {
        let rows = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT uuid, pipeline_id, title, node_type, provider, inputs, config, asset,
                   status, metadata, output, is_valid, validation_errors, created_at, updated_at
            FROM nodes
            WHERE pipeline_id = $1 AND uuid = ANY($2)
            "#,
        )
        .bind(pipeline_id)
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Node::try_from).collect()
    }

    async fn existing_in_pipeline(
        &self,
        pipeline_id: Uuid,
        uuids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        if uuids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<Uuid> =
            sqlx::query_scalar("SELECT uuid FROM nodes WHERE pipeline_id = $1 AND uuid = ANY($2)")
                .bind(pipeline_id)
                .bind(uuids)
                .fetch_all(&self.pool)
                .await?;

        Ok(found.into_iter().collect())
    }

    async fn update_locked(
        &self,
        uuid: Uuid,
        mutation: NodeMutation,
    ) -> StoreResult<Option<LockedUpdate>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT uuid, pipeline_id, title, node_type, provider, inputs, config, asset,
                   status, metadata, output, is_valid, validation_errors, created_at, updated_at
            FROM nodes
            WHERE uuid = $1
            FOR UPDATE
            "#,
        )
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let stored = Node::try_from(row)?;
        let mut node = stored.clone();

        if !mutation(&mut node) {
            tx.rollback().await?;
            return Ok(Some(LockedUpdate {
                node: stored,
                applied: false,
            }));
        }

        node.updated_at = chrono::Utc::now();
        update_row(&mut *tx, &node).await?;
        tx.commit().await?;

        Ok(Some(LockedUpdate {
            node,
            applied: true,
        }))
    }
}

/// Writes every mutable column of a node
async fn update_row<'e, E>(executor: E, node: &Node) -> StoreResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query::<Postgres>(
        r#"
        UPDATE nodes
        SET title = $1, provider = $2, inputs = $3, config = $4, asset = $5,
            status = $6, metadata = $7, output = $8, is_valid = $9,
            validation_errors = $10, updated_at = $11
        WHERE uuid = $12
        "#,
    )
    .bind(&node.title)
    .bind(&node.provider)
    .bind(to_json(node.uuid, &node.inputs)?)
    .bind(to_json(node.uuid, &node.config)?)
    .bind(optional_json(node.uuid, node.asset.as_ref())?)
    .bind(node.status.as_str())
    .bind(to_json(node.uuid, &node.metadata)?)
    .bind(optional_json(node.uuid, node.output.as_ref())?)
    .bind(node.is_valid)
    .bind(to_json(node.uuid, &node.validation_errors)?)
    .bind(node.updated_at)
    .bind(node.uuid)
    .execute(executor)
    .await?;

    Ok(())
}

fn optional_json<T: serde::Serialize>(
    id: Uuid,
    value: Option<&T>,
) -> StoreResult<Option<serde_json::Value>> {
    value.map(|v| to_json(id, v)).transpose()
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct NodeRow {
    uuid: Uuid,
    pipeline_id: Uuid,
    title: String,
    node_type: String,
    provider: String,
    inputs: serde_json::Value,
    config: serde_json::Value,
    asset: Option<serde_json::Value>,
    status: String,
    metadata: serde_json::Value,
    output: Option<serde_json::Value>,
    is_valid: bool,
    validation_errors: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<NodeRow> for Node {
    type Error = StoreError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let id = row.uuid;
        let status = row
            .status
            .parse::<NodeStatus>()
            .map_err(|message| StoreError::Corrupt { id, message })?;

        Ok(Node {
            uuid: row.uuid,
            pipeline_id: row.pipeline_id,
            title: row.title,
            node_type: row.node_type,
            provider: row.provider,
            inputs: from_json(id, row.inputs)?,
            config: from_json(id, row.config)?,
            asset: row.asset.map(|v| from_json(id, v)).transpose()?,
            status,
            metadata: from_json(id, row.metadata)?,
            output: row.output.map(|v| from_json(id, v)).transpose()?,
            is_valid: row.is_valid,
            validation_errors: from_json(id, row.validation_errors)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
