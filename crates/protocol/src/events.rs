//! Progress surface events.
//!
//! The progress reporter broadcasts these so that consumers (the task
//! queue, loggers, tests) can follow the surface without being wired into
//! the code that drives it.

use serde::{Deserialize, Serialize};

/// Identifier of one shown progress surface.
pub type SurfaceId = u64;

/// Events emitted by the progress reporter.
///
/// Uses tagged enum serialization:
/// ```json
/// {
///   "type": "updated",
///   "payload": { "surface_id": 3, "text": "pulling manifest" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ProgressEvent {
    /// A new surface became visible.
    Shown { surface_id: SurfaceId, text: String },

    /// The visible text of a surface was replaced.
    Updated { surface_id: SurfaceId, text: String },

    /// A surface was closed and its handle cleared.
    Dismissed { surface_id: SurfaceId },
}

impl ProgressEvent {
    pub fn surface_id(&self) -> SurfaceId {
        match self {
            ProgressEvent::Shown { surface_id, .. }
            | ProgressEvent::Updated { surface_id, .. }
            | ProgressEvent::Dismissed { surface_id } => *surface_id,
        }
    }
}
