//! Error types for job execution.

use thiserror::Error;

/// Errors that can occur while starting or awaiting a job.
///
/// A job that spawns and then exits nonzero is not an error; it is
/// reported through the normal exit path.
#[derive(Error, Debug)]
pub enum JobError {
    /// The process could not be spawned at all.
    #[error("Failed to spawn command '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A standard stream was not captured after spawning.
    #[error("Failed to capture {0} of the spawned job")]
    MissingPipe(&'static str),

    /// The job's monitor stopped without reporting an exit.
    #[error("Job {0} ended without an exit notification")]
    MonitorLost(uuid::Uuid),
}
