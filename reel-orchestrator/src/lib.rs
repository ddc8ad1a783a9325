//! Reel Orchestrator
//!
//! Node execution engine for media pipelines: node management, the
//! execution state machine, executors, asynchronous callbacks, the work
//! queue and the HTTP API in front of them.

pub mod api;
pub mod config;
pub mod db;
pub mod executor;
pub mod queue;
pub mod repository;
pub mod service;

#[cfg(test)]
mod testing;
