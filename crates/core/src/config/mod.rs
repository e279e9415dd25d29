mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, load_env_config};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::NotFound,
            Self::ParseError(_) | Self::ValidationError(_) => ErrorKind::Validation,
        }
    }
}
