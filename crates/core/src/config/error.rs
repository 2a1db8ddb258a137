//! Error types for settings and configuration files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading settings or persisting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to render the configuration as TOML.
    #[error("Failed to serialize configuration for {path}: {source}")]
    TomlSerialize {
        path: PathBuf,
        source: toml::ser::Error,
    },

    /// Failed to create the configuration directory.
    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the configuration file.
    #[error("Failed to write file {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// One or more settings are empty.
    #[error("Configuration is incomplete, missing: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    /// The platform has no per-user configuration directory.
    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
