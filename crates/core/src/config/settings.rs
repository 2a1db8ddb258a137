//! Wizard settings from `settings.toml`.
//!
//! Every field has a default, so a missing file or a partial file is valid:
//!
//! ```toml
//! default_host = "192.168.1.20:11434"
//! dismiss_delay_ms = 1500
//!
//! [download]
//! program = "ollama"
//! args = ["pull", "{model}"]
//! env = { OLLAMA_HOST = "{host}" }
//! ```

use crate::config::error::{ConfigError, ConfigResult};
use crate::job::JobSpec;
use lb_protocol::ModelRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1:11434";
const DEFAULT_COMPLETION_MODEL: &str = "qwen2.5-coder:1.5b";
const DEFAULT_CHAT_MODEL: &str = "llama3:8b";
const DEFAULT_DISMISS_DELAY_MS: u64 = 3000;
const DEFAULT_ERROR_MARKER: &str = "ERROR";

const DISCOVERY_SCRIPT: &str = r#"models=$(OLLAMA_HOST="$1" ollama list 2>/dev/null) || { echo ERROR; exit 0; }
printf '%s\n' "$models" | awk 'NR > 1 { print $1 }'"#;

/// A collaborator command with `{host}` and `{model}` placeholders.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    /// Substitute placeholders and produce a runnable job specification.
    ///
    /// `{model}` renders as an empty string when no model is given.
    pub fn render(&self, host: &str, model: Option<&str>) -> JobSpec {
        let fill = |text: &str| {
            text.replace("{host}", host)
                .replace("{model}", model.unwrap_or_default())
        };

        let mut spec = JobSpec::new(
            fill(&self.program),
            self.args.iter().map(|arg| fill(arg)).collect(),
        );
        for (key, value) in &self.env {
            spec = spec.with_env(key, fill(value));
        }
        spec
    }

    /// Whether the program can be found on `PATH` (or exists, for paths).
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}

/// Settings that shape the wizard's defaults and collaborators.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WizardSettings {
    /// Host offered when the user does not type one.
    pub default_host: String,

    /// Completion model pulled when the host has no models.
    pub default_completion_model: String,

    /// Chat model pulled when the host has no models.
    pub default_chat_model: String,

    /// How long a finished download message stays visible.
    pub dismiss_delay_ms: u64,

    /// Discovery output that signals failure when it is the only line.
    pub error_marker: String,

    /// Lists the models at `{host}`, one per line.
    pub discovery: CommandTemplate,

    /// Downloads `{model}` from `{host}`, streaming progress.
    pub download: CommandTemplate,
}

impl Default for WizardSettings {
    fn default() -> Self {
        let mut download = CommandTemplate::new(
            "ollama",
            vec!["pull".to_string(), "{model}".to_string()],
        );
        download
            .env
            .insert("OLLAMA_HOST".to_string(), "{host}".to_string());

        Self {
            default_host: DEFAULT_HOST.to_string(),
            default_completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            default_chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dismiss_delay_ms: DEFAULT_DISMISS_DELAY_MS,
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            discovery: CommandTemplate::new(
                "sh",
                vec![
                    "-c".to_string(),
                    DISCOVERY_SCRIPT.to_string(),
                    "llm-bootstrap-discover".to_string(),
                    "{host}".to_string(),
                ],
            ),
            download,
        }
    }
}

impl WizardSettings {
    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults; fields absent from the file keep
    /// their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or is not
    /// valid TOML.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The default model for `role`.
    pub fn default_model(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Completion => &self.default_completion_model,
            ModelRole::Chat => &self.default_chat_model,
        }
    }

    pub fn dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.dismiss_delay_ms)
    }
}
