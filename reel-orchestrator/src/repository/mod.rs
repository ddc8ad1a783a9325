//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles storage operations for a specific domain entity.
//!
//! Repositories are trait-based so the engine can run against PostgreSQL in
//! production and against the in-memory store in tests and local runs.

pub mod memory;
pub mod node;
pub mod pipeline;

pub use memory::InMemoryStore;
pub use node::{LockedUpdate, NodeMutation, NodeRepository};
pub use pipeline::PipelineRepository;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record could not be decoded or encoded
    #[error("corrupt record {id}: {message}")]
    Corrupt { id: Uuid, message: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything the engine needs from storage
pub trait Store: NodeRepository + PipelineRepository {}

impl<T: NodeRepository + PipelineRepository> Store for T {}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) fn to_json<T: serde::Serialize>(id: Uuid, value: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt {
        id,
        message: e.to_string(),
    })
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    id: Uuid,
    value: serde_json::Value,
) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        id,
        message: e.to_string(),
    })
}
