//! Worker auth error types, mapped 1:1 to spec.md §4.D's wire codes.

use thiserror::Error;

/// Verification failure, in the exact order the six checks run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// One of `X-Worker-HMAC`/`X-Worker-Timestamp`/`X-Worker-RequestId` was
    /// absent.
    #[error("missing one or more worker auth headers")]
    MissingHeaders,
    /// `X-Worker-Timestamp` was present but not a parseable integer.
    #[error("worker auth timestamp is not parseable")]
    InvalidTimestamp,
    /// The timestamp is outside `NONCE_TTL_MS` of the verifier's clock.
    #[error("worker auth timestamp outside the allowed TTL window")]
    TtlExpired,
    /// `requestId` has already been claimed (a replay attempt).
    #[error("worker auth requestId already seen")]
    ReplayDetected,
    /// The provided HMAC did not match the expected signature.
    #[error("worker auth HMAC did not verify")]
    HmacInvalid,
}

impl VerifyError {
    /// Wire code surfaced in the HTTP rejection body.
    #[must_use]
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::MissingHeaders => "MISSING_HEADERS",
            Self::InvalidTimestamp => "INVALID_TIMESTAMP",
            Self::TtlExpired => "TTL_EXPIRED",
            Self::ReplayDetected => "REPLAY_DETECTED",
            Self::HmacInvalid => "HMAC_INVALID",
        }
    }
}

/// Errors arising from the backing nonce store rather than the
/// verification logic itself.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A request failed verification.
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),
    /// The nonce store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),
}

/// Result alias for worker auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
