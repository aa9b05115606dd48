//! Error types for the audit crate.

use thiserror::Error;

/// Errors produced when opening the audit log.
///
/// Note that *writing* audit records is infallible by design; only opening
/// the sink can fail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file (or its parent directory) could not be opened.
    #[error("failed to open audit log {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Convenience alias.
pub type AuditResult<T> = Result<T, AuditError>;
