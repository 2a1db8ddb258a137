//! Task queue lifecycle models.

use serde::{Deserialize, Serialize};

/// Lifecycle of a task queue.
///
/// Idle -> Running -> Complete, or Running -> Failed when a task or its
/// completion errors. Complete and Failed are terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    /// Created but never started.
    Idle,

    /// A task is executing or awaiting its asynchronous completion.
    Running,

    /// The cursor reached the end of the queue.
    Complete,

    /// A task failed; the cursor stays on it and nothing runs again.
    Failed,
}

/// Whether a task finishes inline or hands off to a background job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Sync,
    Async,
}

/// Result of a single queue advance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueStep {
    /// The task at `index` ran to completion.
    Ran { index: usize },

    /// The task at `index` started background work; the next advance
    /// waits for it.
    Awaiting { index: usize },

    /// Nothing left to run.
    Complete,
}
