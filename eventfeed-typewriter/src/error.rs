//! Scheduler errors.

use thiserror::Error;

/// Errors that can occur when creating a scheduler.
#[derive(Debug, Error)]
pub enum TypewriterError {
    /// No Tokio runtime is available to drive the timer.
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for scheduler operations.
pub type TypewriterResult<T> = Result<T, TypewriterError>;
