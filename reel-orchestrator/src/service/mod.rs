//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod callback;
pub mod lifecycle;
pub mod node;
pub mod pipeline;
pub mod validation;

// Re-export for convenience
pub use callback as callback_service;
pub use lifecycle as lifecycle_service;
pub use node as node_service;
pub use pipeline as pipeline_service;
pub use validation as validation_service;
