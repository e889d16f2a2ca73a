//! Frame parsing errors.

use thiserror::Error;

/// Errors that can occur while parsing an event stream.
///
/// Malformed lines are never an error; they are skipped. Only resource
/// limits and JSON payload decoding can fail.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A single line grew beyond the configured carry-buffer limit.
    #[error("Frame buffer overflow: line exceeds {limit} bytes")]
    BufferOverflow {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// JSON decoding of a record payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for frame parsing operations.
pub type StreamResult<T> = Result<T, StreamError>;
