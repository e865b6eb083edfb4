//! Router error types.

use thiserror::Error;

/// Errors surfaced by the router loop or its components.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The persisted store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// The agent's result stream ended with `status = error`.
    #[error("agent turn failed: {0}")]
    AgentError(String),

    /// The configured trigger token did not compile to a valid pattern.
    #[error("invalid trigger token: {0}")]
    InvalidTrigger(String),
}

/// Result alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
