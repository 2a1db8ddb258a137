//! Spinner-backed progress surface.

use indicatif::{ProgressBar, ProgressStyle};
use lb_core::progress::ProgressSurface;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Renders the progress surface as a single spinner line on stderr.
///
/// Each `show` creates a fresh spinner; `close` clears it from the screen.
#[derive(Debug, Default)]
pub struct SpinnerSurface {
    bar: Option<ProgressBar>,
}

impl SpinnerSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently displayed, if a spinner is up.
    pub fn message(&self) -> Option<String> {
        self.bar.as_ref().map(ProgressBar::message)
    }
}

impl ProgressSurface for SpinnerSurface {
    fn show(&mut self, text: &str) {
        if let Some(previous) = self.bar.take() {
            previous.finish_and_clear();
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        bar.set_message(text.to_string());
        bar.enable_steady_tick(TICK_INTERVAL);
        self.bar = Some(bar);
    }

    fn set_text(&mut self, text: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(text.to_string());
        }
    }

    fn close(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
