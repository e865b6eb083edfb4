//! Ops HTTP API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by an ops route handler.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The persisted store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// The governance loop's transition/dispatch logic rejected a write
    /// action.
    #[error("governance error: {0}")]
    Governance(#[from] nanoclaw_governance::GovernanceError),

    /// The memory broker rejected a store/recall request.
    #[error("memory error: {0}")]
    Memory(#[from] nanoclaw_memory::MemoryError),

    /// The limits engine failed while evaluating a write action.
    #[error("limits error: {0}")]
    Limits(#[from] nanoclaw_limits::LimitsError),

    /// The inbound worker HMAC failed verification.
    #[error("auth error: {0}")]
    Auth(#[from] nanoclaw_auth::AuthError),

    /// A requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body did not parse into the expected shape.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller's write action was denied by the limits engine.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// `X-OS-SECRET` was missing, unset on the server, or did not match.
    #[error("unauthorized")]
    Unauthorized,

    /// `X-WRITE-SECRET` was missing, unset on the server, or did not
    /// match either the current or previous rotation secret.
    #[error("forbidden")]
    Forbidden,
}

/// Result alias for ops handlers.
pub type OpsResult<T> = Result<T, OpsError>;

impl IntoResponse for OpsError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Governance(nanoclaw_governance::GovernanceError::InvalidTransition { .. })
            | Self::Governance(nanoclaw_governance::GovernanceError::NoAssignedGroup { .. })
            | Self::Governance(nanoclaw_governance::GovernanceError::GateNotApproved { .. }) => {
                StatusCode::CONFLICT
            }
            Self::Auth(nanoclaw_auth::AuthError::Verify(_)) => StatusCode::UNAUTHORIZED,
            Self::Storage(nanoclaw_storage::StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Storage(nanoclaw_storage::StorageError::AlreadyClaimed(_)) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
