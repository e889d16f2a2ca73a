//! Client and transport errors.

use eventfeed_streaming::StreamError;
use thiserror::Error;

/// Errors reported by an [`EventTransport`](crate::transport::EventTransport).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with a status the client does not accept.
    #[error("HTTP error {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Network failure while connecting or reading.
    #[error("Network error: {0}")]
    Network(String),

    /// The body could not be decoded into text records.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request was cancelled through its token.
    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Create a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Get the HTTP status if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Check if a new connection attempt may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Status { status } => *status == 429 || (500..=599).contains(status),
            Self::Network(_) => true,
            Self::Decode(_) | Self::InvalidRequest(_) | Self::Cancelled => false,
        }
    }
}

impl From<StreamError> for TransportError {
    fn from(err: StreamError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Failures surfaced through the client's `error` event.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The stream could not be established.
    #[error("Failed to open stream: {0}")]
    OpenFailed(#[source] TransportError),

    /// The stream failed after it was open.
    #[error("Stream read failed: {0}")]
    ReadFailed(#[source] TransportError),

    /// The client was destroyed.
    #[error("Client destroyed")]
    Destroyed,

    /// No Tokio runtime was available to drive the connection.
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl ClientError {
    /// Check if this failure happened while establishing the stream.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::OpenFailed(_))
    }

    /// Get the underlying transport error.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::OpenFailed(err) | Self::ReadFailed(err) => Some(err),
            _ => None,
        }
    }

    /// Get the HTTP status if the server rejected the request.
    pub fn status(&self) -> Option<u16> {
        self.transport_error().and_then(TransportError::status)
    }

    /// Check if calling `connect()` again may succeed.
    pub fn is_recoverable(&self) -> bool {
        self.transport_error()
            .is_some_and(TransportError::is_recoverable)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
