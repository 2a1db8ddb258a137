//! Settings and contexts for workflow tests.

use super::fakes::{RecordingSurface, SurfaceOp};
use lb_core::config::{CommandTemplate, WizardSettings};
use lb_core::progress::ProgressReporter;
use lb_core::workflow::WorkflowContext;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A `sh -c` command template.
#[allow(dead_code)]
pub fn shell(script: &str) -> CommandTemplate {
    CommandTemplate::new("sh", vec!["-c".to_string(), script.to_string()])
}

/// A download command that cannot be started.
#[allow(dead_code)]
pub fn missing_program() -> CommandTemplate {
    CommandTemplate::new("llm-bootstrap-missing-program", vec![])
}

/// Default settings with a short dismiss delay and the given download.
#[allow(dead_code)]
pub fn test_settings(download: CommandTemplate) -> WizardSettings {
    WizardSettings {
        dismiss_delay_ms: 10,
        download,
        ..WizardSettings::default()
    }
}

#[allow(dead_code)]
pub fn config_path(temp: &TempDir) -> PathBuf {
    temp.path().join("llm-bootstrap").join("config.toml")
}

/// A context writing to `temp`, with a recorded progress surface.
#[allow(dead_code)]
pub fn test_context(
    temp: &TempDir,
    settings: WizardSettings,
) -> (WorkflowContext, Arc<Mutex<Vec<SurfaceOp>>>) {
    let (surface, ops) = RecordingSurface::new();
    let reporter = ProgressReporter::new(Box::new(surface));
    let ctx = WorkflowContext::new(settings, reporter, config_path(temp));
    (ctx, ops)
}
