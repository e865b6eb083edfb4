//! IPC broker error types (spec.md §4.C).

use thiserror::Error;

/// Errors a task handler or the broker itself can raise while servicing
/// one request.
#[derive(Debug, Error)]
pub enum IpcError {
    /// No response was written within the caller's timeout.
    #[error("timed out waiting for a response")]
    Timeout,
    /// The request was missing a required field.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A capability flag (e.g. `isMain`) does not permit this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A request/response file failed to parse as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IpcError {
    /// Wire code surfaced back to the agent.
    #[must_use]
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result alias for IPC broker operations.
pub type IpcResult<T> = Result<T, IpcError>;
