//! # lb-protocol
//!
//! Shared data models for llm-bootstrap.
//!
//! This crate defines the plain data structures exchanged between the
//! orchestration core, the terminal front end and the persisted files:
//! - The persisted setup configuration
//! - Job exit and output framing descriptions
//! - Task queue states and steps
//! - Progress surface events
//!
//! ## Modules
//!
//! - [`config_models`]: Persisted configuration and model roles
//! - [`job_models`]: External job output and exit models
//! - [`queue_models`]: Task queue lifecycle models
//! - [`events`]: Progress surface events
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde and uuid
//! - Independent compilation: No dependencies on other llm-bootstrap crates

pub mod config_models;
pub mod events;
pub mod job_models;
pub mod queue_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use events::*;
pub use job_models::*;
pub use queue_models::*;
