//! Channel error types.

use thiserror::Error;

/// Errors produced by notification channels.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A prompt could not be delivered.
    #[error("failed to send prompt: {0}")]
    Send(String),

    /// An outcome update could not be delivered.
    #[error("failed to update prompt: {0}")]
    Update(String),

    /// The channel configuration is unusable.
    #[error("channel configuration error: {0}")]
    Config(String),

    /// Startup validation failed.
    #[error("{0}")]
    Validation(String),
}

/// Convenience alias.
pub type ChannelResult<T> = Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChannelError>();
    }
}
