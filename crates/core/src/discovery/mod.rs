//! Model discovery: which models does a host already have?

use crate::config::CommandTemplate;
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to run discovery command '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Discovery command exited unsuccessfully (code {code:?}): {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("Discovery reported an error for host {host}")]
    Reported { host: String },
}

/// Lists the models available at a host.
#[async_trait]
pub trait ModelDiscovery: Send + Sync {
    async fn discover(&self, host: &str) -> Result<Vec<String>, DiscoveryError>;
}

/// Discovery backed by an external command printing one model per line.
#[derive(Debug, Clone)]
pub struct CommandDiscovery {
    command: CommandTemplate,
    error_marker: String,
}

impl CommandDiscovery {
    pub fn new(command: CommandTemplate, error_marker: impl Into<String>) -> Self {
        Self {
            command,
            error_marker: error_marker.into(),
        }
    }

    /// Parse discovery output into model names.
    ///
    /// Lines are trimmed, blanks dropped and duplicates removed keeping the
    /// first occurrence. Output consisting of the error marker alone is a
    /// failure.
    pub fn parse_listing(&self, host: &str, stdout: &str) -> Result<Vec<String>, DiscoveryError> {
        let mut models: Vec<String> = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !models.iter().any(|known| known == line) {
                models.push(line.to_string());
            }
        }

        if models.len() == 1 && models[0] == self.error_marker {
            return Err(DiscoveryError::Reported {
                host: host.to_string(),
            });
        }
        Ok(models)
    }
}

#[async_trait]
impl ModelDiscovery for CommandDiscovery {
    async fn discover(&self, host: &str) -> Result<Vec<String>, DiscoveryError> {
        let spec = self.command.render(host, None);
        debug!(command = %spec, "discovering models");

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .envs(
                spec.env
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DiscoveryError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let error = DiscoveryError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            };
            warn!(host, error = %error, "model discovery failed");
            return Err(error);
        }

        let models = self.parse_listing(host, &String::from_utf8_lossy(&output.stdout))?;
        debug!(host, count = models.len(), "models discovered");
        Ok(models)
    }
}
