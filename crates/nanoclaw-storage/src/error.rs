//! Storage error types.

use thiserror::Error;

/// Errors surfaced by the persistent store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A compare-and-swap update was attempted against a stale `version`.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The row whose version did not match.
        id: String,
        /// The version the caller expected.
        expected: u64,
        /// The version actually stored.
        actual: u64,
    },

    /// A unique-constraint insert (the dispatch/claim primitive) found an
    /// existing row under the same key.
    #[error("already claimed: {0}")]
    AlreadyClaimed(String),

    /// Failed to connect to the backing `SurrealDB` instance.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query executed but the engine reported an error.
    #[error("internal storage error: {0}")]
    Internal(String),

    /// A value could not be serialized/deserialized to/from its stored
    /// representation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A key or namespace was malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_display() {
        let err = StorageError::VersionConflict {
            id: "T".to_string(),
            expected: 4,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "version conflict on T: expected 4, found 5"
        );
    }
}
