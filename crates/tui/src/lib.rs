//! # lb-tui
//!
//! Terminal front end for llm-bootstrap.
//!
//! This crate wires the setup workflow from `lb-core` to the terminal:
//! questions through `dialoguer`, download progress through an
//! `indicatif` spinner, and model discovery through the configured
//! command.

pub mod prompt;
pub mod spinner;

pub use prompt::DialoguerPrompter;
pub use spinner::SpinnerSurface;

use anyhow::Result;
use lb_core::config::WizardSettings;
use lb_core::discovery::CommandDiscovery;
use lb_core::progress::ProgressReporter;
use lb_core::workflow::{SetupWorkflow, WorkflowContext, WorkflowOutcome};
use std::path::PathBuf;
use tracing::debug;

/// Inputs for one interactive setup run.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Where the configuration is written.
    pub config_path: PathBuf,
    pub settings: WizardSettings,
    /// Run even if `config_path` already exists.
    pub force: bool,
}

/// Run the setup wizard on the terminal.
pub async fn run_setup(options: SetupOptions) -> Result<WorkflowOutcome> {
    let SetupOptions {
        config_path,
        settings,
        force,
    } = options;
    debug!(path = %config_path.display(), force, "starting interactive setup");

    let discovery = CommandDiscovery::new(settings.discovery.clone(), settings.error_marker.clone());
    let reporter = ProgressReporter::new(Box::new(SpinnerSurface::new()));
    let ctx = WorkflowContext::new(settings, reporter, config_path).with_force(force);

    let mut workflow = SetupWorkflow::new(
        ctx,
        Box::new(DialoguerPrompter::new()),
        Box::new(discovery),
    );
    workflow.run().await
}
