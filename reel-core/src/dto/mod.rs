//! Data Transfer Objects for inter-service communication
//!
//! Requests accepted by the orchestrator API and the callback payload sent
//! by functions that complete asynchronously.

pub mod callback;
pub mod node;
pub mod pipeline;
