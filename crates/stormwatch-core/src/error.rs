//! Error types for configuration loading.

use std::path::PathBuf;

use stormwatch_models::RegistryError;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("{0} not set. Add it to the environment or the .env file.")]
    MissingVar(&'static str),

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    /// The locations file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The locations file is not valid TOML.
    #[error("Failed to parse locations file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configured points do not form a valid registry.
    #[error("Invalid locations: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
