//! Persistence of the setup configuration.
//!
//! The configuration lives at `<config dir>/llm-bootstrap/config.toml`.
//! A readable file there is the signal that first-run setup has completed.
//! Writes go through a temporary file in the same directory that is then
//! renamed into place, so a failed write never leaves a partial file.

use crate::config::error::{ConfigError, ConfigResult};
use lb_protocol::SetupConfig;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Directory name under the user configuration directory.
pub const APP_DIR_NAME: &str = "llm-bootstrap";

/// File holding the persisted setup configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// File holding optional wizard settings.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// The per-user directory holding llm-bootstrap files.
pub fn app_config_dir() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn default_config_path() -> ConfigResult<PathBuf> {
    Ok(app_config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn default_settings_path() -> ConfigResult<PathBuf> {
    Ok(app_config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Whether setup has already been completed for `path`.
///
/// A file that cannot be loaded does not count.
pub fn is_configured(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match load(path) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "ignoring unusable configuration file");
            false
        }
    }
}

/// Write `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns `ConfigError::Incomplete` if any setting is empty, otherwise an
/// I/O or serialization error. Nothing is written on error.
pub fn save(path: &Path, config: &SetupConfig) -> ConfigResult<()> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(ConfigError::Incomplete { missing });
    }

    let content = toml::to_string(config).map_err(|source| ConfigError::TomlSerialize {
        path: path.to_path_buf(),
        source,
    })?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreate {
        path: parent.to_path_buf(),
        source,
    })?;

    let write_error = |source| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut staged = NamedTempFile::new_in(parent).map_err(write_error)?;
    staged.write_all(content.as_bytes()).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
}

/// Read the persisted configuration from `path`.
pub fn load(path: &Path) -> ConfigResult<SetupConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}
