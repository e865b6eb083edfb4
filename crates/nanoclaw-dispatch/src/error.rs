//! Dispatcher error types.

use thiserror::Error;

/// Errors surfaced by worker selection, dispatch, or the health loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The persisted store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// No online worker with spare capacity serves the requested group.
    #[error("no capacity available for group {group}")]
    NoCapacity {
        /// The group a caller tried to dispatch into.
        group: String,
    },

    /// The worker's tunnel/HTTP endpoint could not be reached at all.
    #[error("tunnel down for worker {worker_id}: {detail}")]
    TunnelDown {
        /// The worker whose tunnel appears down.
        worker_id: String,
        /// Underlying transport error text.
        detail: String,
    },

    /// The worker responded, but not with success.
    #[error("worker {worker_id} returned HTTP {status}")]
    HttpError {
        /// The worker that answered.
        worker_id: String,
        /// The status code it returned.
        status: u16,
    },

    /// A dispatch payload could not be serialized.
    #[error("failed to serialize dispatch payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
