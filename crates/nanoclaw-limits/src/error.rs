//! Limits engine error types.

use thiserror::Error;

/// Errors that can arise while evaluating or configuring limits.
#[derive(Debug, Error)]
pub enum LimitsError {
    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// No configuration was registered for the requested operation.
    #[error("unconfigured operation: {0}")]
    UnconfiguredOp(String),
}

/// Result alias for limits engine operations.
pub type LimitsResult<T> = Result<T, LimitsError>;
