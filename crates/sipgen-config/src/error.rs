//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// An explicitly requested config file does not exist.
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    /// A configuration field has an invalid value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}
