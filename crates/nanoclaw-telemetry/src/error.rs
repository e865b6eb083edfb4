//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed (e.g. by a previous call
    /// or by the test harness).
    #[error("global tracing subscriber already set: {0}")]
    AlreadySet(String),

    /// The env-filter directive string (`RUST_LOG` or an explicit
    /// directive) could not be parsed.
    #[error("invalid log filter directive: {0}")]
    InvalidDirective(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
