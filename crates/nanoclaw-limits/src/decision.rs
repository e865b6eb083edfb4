//! The uniform decision type returned by [`crate::engine::LimitsEngine::enforce`].

use serde::{Deserialize, Serialize};

/// Uniform deny codes surfaced to every caller of `enforce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyCode {
    /// The per-minute rate counter for this `(op, scope_key)` is exhausted.
    RateLimitExceeded,
    /// Today's hard quota for this `(op, scope_key)` is exhausted.
    DailyQuotaExceeded,
    /// Today's usage crossed the soft-warn threshold; the call is still
    /// allowed.
    DailyQuotaSoftWarn,
    /// The circuit breaker for the targeted provider is open.
    ProviderBreakerOpen,
    /// Limits enforcement is globally disabled for this operation family
    /// (the kill switch).
    LimitsDisabled,
    /// The operation has a zero-valued configured rate or hard limit,
    /// meaning it is not authorized at all.
    NotAuthorized,
}

impl DenyCode {
    /// Wire string used in IPC/HTTP responses and the denial log.
    #[must_use]
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::DailyQuotaExceeded => "DAILY_QUOTA_EXCEEDED",
            Self::DailyQuotaSoftWarn => "DAILY_QUOTA_SOFT_WARN",
            Self::ProviderBreakerOpen => "PROVIDER_BREAKER_OPEN",
            Self::LimitsDisabled => "LIMITS_DISABLED",
            Self::NotAuthorized => "NOT_AUTHORIZED",
        }
    }
}

/// Context passed into `enforce` describing the caller and target of one
/// limited operation.
#[derive(Debug, Clone)]
pub struct LimitContext {
    /// Caller/tenant scope key (e.g. a group folder name).
    pub scope_key: String,
    /// Upstream provider this call will exercise, if the breaker check
    /// applies (e.g. `"anthropic"`, `"trello"`). `None` skips the breaker
    /// check entirely.
    pub provider: Option<String>,
}

/// Outcome of one `enforce` call.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// The deny code, if `allowed` is false, or `Some(SoftWarn)` even when
    /// allowed, to annotate a soft quota warning.
    pub code: Option<DenyCode>,
    /// Whether this is a soft warning rather than a hard deny. Soft warns
    /// never set `allowed = false`.
    pub soft_warn: bool,
    /// Human-readable detail for logs/diagnostics.
    pub detail: Option<String>,
}

impl Decision {
    /// Build an unconditional allow with no annotations.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            code: None,
            soft_warn: false,
            detail: None,
        }
    }

    /// Build an allow annotated with a soft quota warning.
    #[must_use]
    pub fn allow_with_soft_warn(detail: impl Into<String>) -> Self {
        Self {
            allowed: true,
            code: Some(DenyCode::DailyQuotaSoftWarn),
            soft_warn: true,
            detail: Some(detail.into()),
        }
    }

    /// Build a hard deny.
    #[must_use]
    pub fn deny(code: DenyCode, detail: impl Into<String>) -> Self {
        Self {
            allowed: false,
            code: Some(code),
            soft_warn: false,
            detail: Some(detail.into()),
        }
    }
}
