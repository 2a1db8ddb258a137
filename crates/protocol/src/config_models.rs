//! Persisted configuration models.
//!
//! This module defines the configuration written once at the end of a
//! successful setup, and the two roles a model can be chosen for.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// The role a local model is provisioned for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Inline code completion.
    Completion,

    /// Conversational chat.
    Chat,
}

impl ModelRole {
    /// Both roles, in the order the wizard asks for them.
    pub const ALL: [ModelRole; 2] = [ModelRole::Completion, ModelRole::Chat];

    /// Human-readable label used in prompts and progress messages.
    pub fn label(self) -> &'static str {
        match self {
            ModelRole::Completion => "code completion",
            ModelRole::Chat => "chat",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The settings persisted by a completed setup.
///
/// Serialized as exactly three assignments:
///
/// ```toml
/// host = "127.0.0.1:11434"
/// completion_model = "qwen2.5-coder:1.5b"
/// chat_model = "llama3:8b"
/// ```
///
/// The presence of this file is what marks first-run setup as done.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Address of the model-serving host.
    pub host: String,

    /// Identifier of the model used for code completion.
    pub completion_model: String,

    /// Identifier of the model used for chat.
    pub chat_model: String,
}

impl SetupConfig {
    /// Create a configuration from its three settings.
    pub fn new(
        host: impl Into<String>,
        completion_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            completion_model: completion_model.into(),
            chat_model: chat_model.into(),
        }
    }

    /// The model chosen for `role`.
    pub fn model(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Completion => &self.completion_model,
            ModelRole::Chat => &self.chat_model,
        }
    }

    /// Names of the settings that are empty (or whitespace only).
    ///
    /// A configuration is only valid for persistence when this is empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("host", &self.host),
            ("completion_model", &self.completion_model),
            ("chat_model", &self.chat_model),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
