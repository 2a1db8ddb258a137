//! The live progress surface.
//!
//! A single replaceable status display driven by whichever job currently
//! owns it. The surface itself is terminal-agnostic (`ProgressSurface`);
//! `ProgressReporter` adds identity, no-op-safe updates, one-shot timed
//! dismissal, and a broadcast of `ProgressEvent`s so that control flow can
//! follow dismissals without being wired into UI timing.

pub mod reporter;

pub use reporter::{DismissalWatch, ProgressReporter};

use lb_protocol::SurfaceId;
use thiserror::Error;

/// A visible status display.
pub trait ProgressSurface: Send {
    /// Make the surface visible with `text`.
    fn show(&mut self, text: &str);

    /// Replace the visible text.
    fn set_text(&mut self, text: &str);

    /// Tear the surface down.
    fn close(&mut self);
}

/// A surface that renders nothing, for headless runs.
#[derive(Debug, Default)]
pub struct HiddenSurface;

impl ProgressSurface for HiddenSurface {
    fn show(&mut self, _text: &str) {}

    fn set_text(&mut self, _text: &str) {}

    fn close(&mut self) {}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("No progress surface is shown")]
    NothingShown,

    #[error("Progress surface {0} already has a pending dismissal")]
    DismissalPending(SurfaceId),

    #[error("Progress reporter was dropped before surface {0} was dismissed")]
    ReporterClosed(SurfaceId),
}
