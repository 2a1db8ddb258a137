//! # lb-core
//!
//! Setup orchestration for llm-bootstrap.
//!
//! This crate provides:
//! - A runner that owns the single long-running download job
//! - A replaceable progress surface with timed auto-dismiss
//! - A sequential task queue with synchronous and asynchronous tasks
//! - The setup workflow that ties discovery, prompts and the queue together
//! - Settings loading and configuration persistence
//!
//! ## Modules
//!
//! - [`config`]: Wizard settings and the persisted setup configuration
//! - [`discovery`]: Listing the models available at a host
//! - [`job`]: External job spawning, output framing and replacement
//! - [`progress`]: The live progress surface
//! - [`queue`]: Sequential task queue
//! - [`workflow`]: The concrete setup steps and their orchestration

pub mod config;
pub mod discovery;
pub mod job;
pub mod progress;
pub mod queue;
pub mod workflow;
