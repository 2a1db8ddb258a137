//! Configuration loading and persistence.
//!
//! This module provides:
//! - `WizardSettings` loaded from the optional `settings.toml`
//! - Rendering of collaborator command templates
//! - Reading and writing the persisted `config.toml`

pub mod error;
pub mod settings;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use settings::{CommandTemplate, WizardSettings};
