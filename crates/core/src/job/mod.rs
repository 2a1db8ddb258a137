//! External job execution.
//!
//! This module provides:
//! - `JobSpec`: what to run and how to frame its output
//! - `JobRunner`: owner of the single active job, with replacement
//! - `JobHandler`: the per-job callbacks for output lines and exit
//! - Line framing for streamed process output

pub mod error;
pub mod lines;
pub mod runner;

pub use error::JobError;
pub use lines::{line_stream, LineSplitter};
pub use runner::{JobHandle, JobHandler, JobRunner};

use lb_protocol::Framing;
use std::fmt;

/// A command to run as a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub framing: Framing,
}

impl JobSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
            framing: Framing::default(),
        }
    }

    /// Add an environment variable for the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
