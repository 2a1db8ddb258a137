//! External job models.
//!
//! This module defines the structures describing a long-running external
//! process: how its output is framed into lines and how it ended.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which standard stream a line of job output came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// How raw job output is cut into logical lines.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Split on `\n` only.
    #[default]
    Lines,

    /// Split on `\n` and `\r`.
    ///
    /// Download tools redraw a progress line in place with carriage
    /// returns; each redraw becomes its own line.
    Progress,
}

/// How a job ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", content = "code", rename_all = "camelCase")]
pub enum ExitOutcome {
    /// Exit code 0.
    Success,

    /// Any nonzero exit code.
    Failed(i32),

    /// The process ended without an exit code (killed by a signal).
    Terminated,
}

impl ExitOutcome {
    /// Map an optional process exit code to an outcome.
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ExitOutcome::Success,
            Some(code) => ExitOutcome::Failed(code),
            None => ExitOutcome::Terminated,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

/// The exit notification delivered once per job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobExit {
    /// Identifier assigned to the job when it was started.
    pub job_id: Uuid,

    /// How the process ended.
    pub outcome: ExitOutcome,

    /// Whether another job replaced this one before it exited.
    ///
    /// A superseded job no longer owns the progress surface; consumers
    /// must not report its exit or advance any workflow from it.
    pub superseded: bool,
}
