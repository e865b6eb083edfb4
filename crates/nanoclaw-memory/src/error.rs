//! Memory Broker error types.

use nanoclaw_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by `mem_store`/`mem_recall`.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// `mem_store` with `level=L3` was attempted by a non-main group.
    #[error("memory access denied: {reason}")]
    AccessDenied {
        /// Human-readable reason.
        reason: String,
    },

    /// `mem_recall`/a CAS update targeted a memory id that does not exist.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result alias for memory broker operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
