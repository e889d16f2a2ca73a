//! Reconnect error types.

use eventfeed_client::ClientError;
use thiserror::Error;

/// Why a supervisor gave up on its client.
#[derive(Debug, Clone, Error)]
pub enum ReconnectError {
    /// The client refused to connect (destroyed, or no runtime).
    #[error("Client rejected connect: {0}")]
    Rejected(#[source] ClientError),

    /// The failure is not worth retrying (for example a 404).
    #[error("Not recoverable: {0}")]
    NotRecoverable(#[source] ClientError),

    /// Consecutive failures exceeded the retry budget.
    #[error("Gave up after {attempts} failed attempts: {last}")]
    Exhausted {
        /// Consecutive failed attempts.
        attempts: u32,
        /// The last failure.
        last: ClientError,
    },
}

impl ReconnectError {
    /// The client error that ended supervision.
    pub fn client_error(&self) -> &ClientError {
        match self {
            Self::Rejected(err) | Self::NotRecoverable(err) => err,
            Self::Exhausted { last, .. } => last,
        }
    }
}

/// Result type for reconnect supervision.
pub type ReconnectResult<T> = Result<T, ReconnectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_access() {
        let err = ReconnectError::Exhausted {
            attempts: 4,
            last: ClientError::Destroyed,
        };
        assert!(matches!(err.client_error(), ClientError::Destroyed));
        assert!(err.to_string().starts_with("Gave up after 4 failed attempts"));
    }
}
