//! The setup task list: download each model, then persist the result.

use super::context::WorkflowContext;
use crate::config::store;
use crate::job::JobHandler;
use crate::progress::ProgressReporter;
use crate::queue::{Completion, Task, TaskOutcome, TaskQueue};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lb_protocol::{ExitOutcome, Framing, JobExit, ModelRole, TaskKind};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Build the fixed setup queue: pull completion, pull chat, finalize.
///
/// Starting at 0 provisions both models; starting at `last_index()` only
/// writes the configuration.
pub fn setup_queue() -> TaskQueue<WorkflowContext> {
    let tasks: Vec<Box<dyn Task<WorkflowContext>>> = vec![
        Box::new(PullModelTask::new(ModelRole::Completion)),
        Box::new(PullModelTask::new(ModelRole::Chat)),
        Box::new(FinalizeTask),
    ];
    TaskQueue::new(tasks)
}

/// Downloads the model chosen for one role.
///
/// Finishes once the download has exited and its result message has been
/// dismissed from the progress surface.
pub struct PullModelTask {
    role: ModelRole,
    name: String,
}

impl PullModelTask {
    pub fn new(role: ModelRole) -> Self {
        let slug = match role {
            ModelRole::Completion => "completion",
            ModelRole::Chat => "chat",
        };
        Self {
            role,
            name: format!("pull-{slug}-model"),
        }
    }
}

#[async_trait]
impl Task<WorkflowContext> for PullModelTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Async
    }

    async fn run(&mut self, ctx: &mut WorkflowContext) -> Result<TaskOutcome> {
        let model = match ctx.draft.model(self.role) {
            Some(model) => model.to_string(),
            None => {
                let model = ctx.settings.default_model(self.role).to_string();
                ctx.draft.set_model(self.role, model.clone());
                model
            }
        };
        let host = ctx.host().to_string();
        let spec = ctx
            .settings
            .download
            .render(&host, Some(&model))
            .with_framing(Framing::Progress);

        info!(role = %self.role, model = %model, host = %host, "pulling model");
        let dismissed = ctx
            .reporter
            .show(format!("Pulling {} model {model}...", self.role));

        let handler = PullProgress {
            reporter: ctx.reporter.clone(),
            model: model.clone(),
            dismiss_delay: ctx.settings.dismiss_delay(),
        };
        let handle = match ctx.runner.start(spec, Box::new(handler)).await {
            Ok(handle) => handle,
            Err(e) => {
                ctx.reporter.close();
                return Err(e).with_context(|| format!("Failed to start download of {model}"));
            }
        };

        let reporter = ctx.reporter.clone();
        Ok(TaskOutcome::Pending(Completion::new(async move {
            let exit = handle.wait().await?;
            if exit.superseded {
                // Nobody will report on this surface anymore.
                if reporter.current_surface() == Some(dismissed.surface_id()) {
                    reporter.close();
                }
                bail!("Download of {model} was replaced by another job");
            }
            dismissed.wait().await?;
            Ok(())
        })))
    }
}

/// Routes download output to the progress surface.
struct PullProgress {
    reporter: ProgressReporter,
    model: String,
    dismiss_delay: Duration,
}

impl JobHandler for PullProgress {
    fn on_stdout(&mut self, line: &str) {
        self.reporter.update(line);
    }

    fn on_stderr(&mut self, line: &str) {
        self.reporter.update(line);
    }

    fn on_exit(&mut self, exit: &JobExit) {
        if exit.superseded {
            debug!(job_id = %exit.job_id, "ignoring exit of replaced download");
            return;
        }

        self.reporter.update(pull_result_message(&self.model, exit.outcome));
        if let Err(e) = self.reporter.dismiss_after(self.dismiss_delay) {
            warn!(error = %e, "could not schedule progress dismissal");
        }
    }
}

/// Final progress text for a finished download.
pub fn pull_result_message(model: &str, outcome: ExitOutcome) -> String {
    match outcome {
        ExitOutcome::Success => format!("Model {model} is ready"),
        ExitOutcome::Failed(code) => format!("Failed to pull {model} (exit code {code})"),
        ExitOutcome::Terminated => format!("Download of {model} was terminated"),
    }
}

/// Writes the collected configuration.
pub struct FinalizeTask;

#[async_trait]
impl Task<WorkflowContext> for FinalizeTask {
    fn name(&self) -> &str {
        "finalize"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Sync
    }

    async fn run(&mut self, ctx: &mut WorkflowContext) -> Result<TaskOutcome> {
        let config = ctx
            .draft
            .build()
            .context("Cannot finalize setup")?;
        store::save(&ctx.config_path, &config).with_context(|| {
            format!(
                "Failed to save configuration to {}",
                ctx.config_path.display()
            )
        })?;

        info!(path = %ctx.config_path.display(), "configuration saved");
        ctx.saved = Some(config);
        Ok(TaskOutcome::Finished)
    }
}
