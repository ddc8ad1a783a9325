//! Core domain types
//!
//! This module contains the core domain structures used across Reel services.
//! These types represent the fundamental business entities and are shared between
//! the orchestrator (for persistence) and the executors (for execution).

pub mod node;
pub mod pipeline;
