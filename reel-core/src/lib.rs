//! Reel Core
//!
//! Core types and abstractions for the Reel media pipeline engine.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Node, etc.)
//! - Schema registry: Per-node-type input slots and provider config fields
//! - Validation: Structured validation of a node against the registry
//! - Graph: Reference graph helpers used for cycle rejection
//! - DTOs: Data transfer objects for inter-service communication

pub mod domain;
pub mod dto;
pub mod graph;
pub mod schema;
pub mod validation;
