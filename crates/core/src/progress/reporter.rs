//! Progress reporter: identity, updates and timed dismissal.

use crate::progress::{ProgressError, ProgressSurface};
use lb_protocol::{ProgressEvent, SurfaceId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Events buffered per subscriber before older ones are dropped.
const EVENT_CAPACITY: usize = 256;

struct ShownSurface {
    id: SurfaceId,
    text: String,
    pending_dismissal: Option<JoinHandle<()>>,
}

struct ReporterState {
    surface: Box<dyn ProgressSurface>,
    current: Option<ShownSurface>,
    last_id: SurfaceId,
}

/// Shared handle to the single progress surface.
///
/// Cloning is cheap; clones drive the same surface. All methods are
/// synchronous so they can be called from job callbacks.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<Mutex<ReporterState>>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(surface: Box<dyn ProgressSurface>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ReporterState {
                surface,
                current: None,
                last_id: 0,
            })),
            events,
        }
    }

    /// Subscribe to every future progress event.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Show a new surface with `initial_text`.
    ///
    /// Callers are expected to wait for the previous surface's dismissal
    /// first. If one is still visible it is closed (and reported as
    /// dismissed) before the new one appears.
    pub fn show(&self, initial_text: impl Into<String>) -> DismissalWatch {
        let text = initial_text.into();
        let watch_events = self.events.subscribe();

        let (replaced, id) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            let replaced = state.current.take().map(|previous| {
                warn!(
                    surface_id = previous.id,
                    "progress surface shown before the previous one was dismissed"
                );
                if let Some(timer) = previous.pending_dismissal {
                    timer.abort();
                }
                state.surface.close();
                previous.id
            });

            state.last_id += 1;
            let id = state.last_id;
            state.surface.show(&text);
            state.current = Some(ShownSurface {
                id,
                text: text.clone(),
                pending_dismissal: None,
            });
            (replaced, id)
        };

        if let Some(previous) = replaced {
            self.emit(ProgressEvent::Dismissed {
                surface_id: previous,
            });
        }
        self.emit(ProgressEvent::Shown {
            surface_id: id,
            text,
        });

        DismissalWatch {
            surface_id: id,
            events: watch_events,
        }
    }

    /// Replace the visible text. A no-op when nothing is shown.
    pub fn update(&self, text: impl Into<String>) {
        let text = text.into();
        let updated = {
            let mut guard = self.lock();
            let state = &mut *guard;
            match state.current.as_mut() {
                Some(current) => {
                    state.surface.set_text(&text);
                    current.text.clone_from(&text);
                    Some(current.id)
                }
                None => None,
            }
        };

        match updated {
            Some(surface_id) => self.emit(ProgressEvent::Updated { surface_id, text }),
            None => trace!(text, "progress update ignored, no surface shown"),
        }
    }

    /// Close the current surface after `delay`.
    ///
    /// When the timer fires the surface is closed, its handle cleared and a
    /// `Dismissed` event is broadcast from the timer task.
    ///
    /// # Errors
    ///
    /// `NothingShown` if no surface is visible, `DismissalPending` if this
    /// surface already has a dismissal scheduled.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dismiss_after(&self, delay: Duration) -> Result<SurfaceId, ProgressError> {
        let mut guard = self.lock();
        let current = guard.current.as_mut().ok_or(ProgressError::NothingShown)?;
        if current.pending_dismissal.is_some() {
            return Err(ProgressError::DismissalPending(current.id));
        }

        let id = current.id;
        let reporter = self.clone();
        current.pending_dismissal = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reporter.dismiss(id);
        }));
        debug!(surface_id = id, ?delay, "progress dismissal scheduled");

        Ok(id)
    }

    /// Close the current surface immediately.
    ///
    /// Returns the closed surface, or `None` if nothing was shown.
    pub fn close(&self) -> Option<SurfaceId> {
        let closed = {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.current.take().map(|current| {
                if let Some(timer) = current.pending_dismissal {
                    timer.abort();
                }
                state.surface.close();
                current.id
            })
        };

        if let Some(surface_id) = closed {
            self.emit(ProgressEvent::Dismissed { surface_id });
        }
        closed
    }

    pub fn is_visible(&self) -> bool {
        self.lock().current.is_some()
    }

    pub fn current_surface(&self) -> Option<SurfaceId> {
        self.lock().current.as_ref().map(|current| current.id)
    }

    pub fn current_text(&self) -> Option<String> {
        self.lock()
            .current
            .as_ref()
            .map(|current| current.text.clone())
    }

    /// Timer target: close `id` if it is still the current surface.
    fn dismiss(&self, id: SurfaceId) {
        let dismissed = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.current.as_ref().is_some_and(|current| current.id == id) {
                state.current = None;
                state.surface.close();
                true
            } else {
                false
            }
        };

        if dismissed {
            self.emit(ProgressEvent::Dismissed { surface_id: id });
        } else {
            trace!(surface_id = id, "stale dismissal ignored");
        }
    }

    fn emit(&self, event: ProgressEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves when one particular surface is dismissed.
///
/// Subscribed before the surface is shown, so the dismissal cannot be
/// missed.
#[derive(Debug)]
pub struct DismissalWatch {
    surface_id: SurfaceId,
    events: broadcast::Receiver<ProgressEvent>,
}

impl DismissalWatch {
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub async fn wait(mut self) -> Result<(), ProgressError> {
        loop {
            match self.events.recv().await {
                Ok(ProgressEvent::Dismissed { surface_id }) if surface_id == self.surface_id => {
                    return Ok(());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress watcher lagged behind");
                }
                Err(RecvError::Closed) => {
                    return Err(ProgressError::ReporterClosed(self.surface_id));
                }
            }
        }
    }
}
