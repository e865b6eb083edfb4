//! Error types shared across the NanoClaw core data model.

use thiserror::Error;

/// Errors that can arise while constructing or validating core data model
/// values (independent of any particular storage or transport backend).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A field required by the data model was missing or empty.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A value did not match one of the enumerated variants the model
    /// expects (e.g. an unknown `schedule_type`).
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field whose value was rejected.
        field: String,
        /// The offending value.
        value: String,
    },

    /// A timestamp string could not be parsed as ISO-8601 UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result alias for core data model operations.
pub type CoreResult<T> = Result<T, CoreError>;
