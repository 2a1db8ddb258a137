//! State shared by every setup task.

use crate::config::{ConfigError, ConfigResult, WizardSettings};
use crate::job::JobRunner;
use crate::progress::ProgressReporter;
use lb_protocol::{ModelRole, SetupConfig};
use std::path::PathBuf;

/// Settings collected so far; turned into a `SetupConfig` by finalize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDraft {
    pub host: Option<String>,
    pub completion_model: Option<String>,
    pub chat_model: Option<String>,
}

impl ConfigDraft {
    pub fn model(&self, role: ModelRole) -> Option<&str> {
        match role {
            ModelRole::Completion => self.completion_model.as_deref(),
            ModelRole::Chat => self.chat_model.as_deref(),
        }
    }

    pub fn set_model(&mut self, role: ModelRole, model: impl Into<String>) {
        let slot = match role {
            ModelRole::Completion => &mut self.completion_model,
            ModelRole::Chat => &mut self.chat_model,
        };
        *slot = Some(model.into());
    }

    /// Build the final configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::Incomplete` naming every setting that is unset or empty.
    pub fn build(&self) -> ConfigResult<SetupConfig> {
        let config = SetupConfig::new(
            self.host.clone().unwrap_or_default(),
            self.completion_model.clone().unwrap_or_default(),
            self.chat_model.clone().unwrap_or_default(),
        );
        let missing = config.missing_fields();
        if missing.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Incomplete { missing })
        }
    }
}

/// Everything the workflow and its tasks operate on.
///
/// Owned by the top-level orchestrator and lent to each task in turn; the
/// runner and reporter are the only handles to the active job and the
/// progress surface.
pub struct WorkflowContext {
    pub settings: WizardSettings,
    pub runner: JobRunner,
    pub reporter: ProgressReporter,
    pub draft: ConfigDraft,
    pub config_path: PathBuf,
    /// Run setup even if a configuration already exists.
    pub force: bool,
    /// The configuration written by finalize.
    pub saved: Option<SetupConfig>,
}

impl WorkflowContext {
    pub fn new(settings: WizardSettings, reporter: ProgressReporter, config_path: PathBuf) -> Self {
        Self {
            settings,
            runner: JobRunner::new(),
            reporter,
            draft: ConfigDraft::default(),
            config_path,
            force: false,
            saved: None,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The chosen host, or the configured default before one is chosen.
    pub fn host(&self) -> &str {
        self.draft
            .host
            .as_deref()
            .unwrap_or(&self.settings.default_host)
    }
}
