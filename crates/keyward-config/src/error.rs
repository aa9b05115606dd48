//! Configuration error types.

use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file was not valid TOML for the expected schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A field (or combination of fields) failed validation.
    #[error("invalid config: {field}: {message}")]
    Validation {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// Convenience alias.
pub type ConfigResult<T> = Result<T, ConfigError>;
