//! The first-run setup workflow.
//!
//! ```text
//! configured? --yes--> AlreadyConfigured
//!     |no
//! ask host -> discover models --error--> Aborted(DiscoveryFailed)
//!     |
//!     +-- none found: confirm defaults --no--> Aborted(Declined)
//!     |                   |yes
//!     |               queue from 0: pull completion, pull chat, finalize
//!     |
//!     +-- some found: pick completion, pick chat
//!                         |
//!                     queue from last: finalize
//! ```

pub mod context;
pub mod prompt;
pub mod selection;
pub mod tasks;

pub use context::{ConfigDraft, WorkflowContext};
pub use prompt::{PromptError, Prompter};
pub use selection::{format_model_list, parse_selection, Selection};
pub use tasks::{pull_result_message, setup_queue, FinalizeTask, PullModelTask};

use crate::config::store;
use crate::discovery::ModelDiscovery;
use anyhow::{bail, Context, Result};
use lb_protocol::{ModelRole, SetupConfig};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Why setup stopped without writing a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Listing the host's models failed; carries the error message.
    DiscoveryFailed(String),

    /// The host had no models and the user declined the defaults.
    Declined,
}

/// How a setup run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The configuration was written. `start_index` is where the task queue
    /// was started: 0 when models were downloaded, the finalize step when
    /// existing models were chosen.
    Completed {
        config: SetupConfig,
        start_index: usize,
    },
    Aborted(AbortReason),
    /// A configuration already exists at this path and setup was not forced.
    AlreadyConfigured(PathBuf),
}

/// Drives one setup run from the host prompt to the saved configuration.
pub struct SetupWorkflow {
    ctx: WorkflowContext,
    prompter: Box<dyn Prompter>,
    discovery: Box<dyn ModelDiscovery>,
}

impl SetupWorkflow {
    pub fn new(
        ctx: WorkflowContext,
        prompter: Box<dyn Prompter>,
        discovery: Box<dyn ModelDiscovery>,
    ) -> Self {
        Self {
            ctx,
            prompter,
            discovery,
        }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    pub fn into_context(self) -> WorkflowContext {
        self.ctx
    }

    /// Run setup to completion.
    ///
    /// Discovery failure and declining the defaults are outcomes, not
    /// errors. Errors come from the terminal, from a download that cannot
    /// be started, or from writing the configuration.
    pub async fn run(&mut self) -> Result<WorkflowOutcome> {
        if !self.ctx.force && store::is_configured(&self.ctx.config_path) {
            info!(path = %self.ctx.config_path.display(), "already configured, skipping setup");
            return Ok(WorkflowOutcome::AlreadyConfigured(
                self.ctx.config_path.clone(),
            ));
        }

        let host = self.ask_host()?;
        self.ctx.draft.host = Some(host.clone());

        let models = match self.discovery.discover(&host).await {
            Ok(models) => models,
            Err(e) => {
                warn!(host = %host, error = %e, "aborting setup");
                return Ok(WorkflowOutcome::Aborted(AbortReason::DiscoveryFailed(
                    e.to_string(),
                )));
            }
        };

        let mut queue = setup_queue();
        let start_index = if models.is_empty() {
            let prompt = format!("No models found at {host}. Download the default models?");
            if !self.prompter.confirm(&prompt, true)? {
                info!("default model download declined");
                return Ok(WorkflowOutcome::Aborted(AbortReason::Declined));
            }
            for role in ModelRole::ALL {
                let model = self.ctx.settings.default_model(role).to_string();
                self.ctx.draft.set_model(role, model);
            }
            if !self.ctx.settings.download.is_available() {
                warn!(
                    program = %self.ctx.settings.download.program,
                    "download program not found on PATH"
                );
            }
            0
        } else {
            self.prompter.message(&format!(
                "Models available at {host}:\n{}",
                format_model_list(&models)
            ));
            for role in ModelRole::ALL {
                let model = self.choose_model(role, &models)?;
                self.ctx.draft.set_model(role, model);
            }
            queue.last_index()
        };

        let runner = self.ctx.runner.clone();
        let reporter = self.ctx.reporter.clone();
        tokio::select! {
            result = queue.run(start_index, &mut self.ctx) => {
                result.context("Setup did not complete")?;
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, stopping setup");
                runner.stop().await;
                reporter.close();
                bail!("Setup interrupted");
            }
        }

        let config = self
            .ctx
            .saved
            .clone()
            .context("Setup finished without saving a configuration")?;
        Ok(WorkflowOutcome::Completed {
            config,
            start_index,
        })
    }

    fn ask_host(&mut self) -> Result<String> {
        let default = self.ctx.settings.default_host.clone();
        let answer = self.prompter.input("Model server host", Some(&default))?;
        let host = answer.trim();
        Ok(if host.is_empty() {
            default
        } else {
            host.to_string()
        })
    }

    /// Ask until the answer names one of `models`.
    fn choose_model(&mut self, role: ModelRole, models: &[String]) -> Result<String> {
        let prompt = format!("Select the {role} model [1-{}]", models.len());
        loop {
            let answer = self.prompter.input(&prompt, None)?;
            match parse_selection(&answer, models.len()) {
                Selection::Valid(index) => {
                    debug!(role = %role, model = %models[index], "model selected");
                    return Ok(models[index].clone());
                }
                Selection::NotANumber(raw) => {
                    self.prompter
                        .message(&format!("'{raw}' is not a number, try again"));
                }
                Selection::OutOfRange(number) => {
                    self.prompter.message(&format!(
                        "{number} is not between 1 and {}, try again",
                        models.len()
                    ));
                }
            }
        }
    }
}
