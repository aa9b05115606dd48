//! Provider error types.

use thiserror::Error;

/// Errors produced by secret providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider is registered under the requested name.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// A credential file could not be read.
    #[error("credential error: {0}")]
    Credential(String),

    /// The backend failed to produce a value.
    #[error("{0}")]
    Fetch(String),

    /// Startup validation failed.
    #[error("{0}")]
    Validation(String),
}

/// Convenience alias.
pub type ProviderResult<T> = Result<T, ProviderError>;
