//! Rate-limit, quota, circuit-breaker, and replay-protection data model
//! (owned by the Limits Engine and Worker Auth).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replay-protection record for one HMAC-authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nonce {
    /// The `requestId` this nonce guards.
    pub request_id: String,
    /// When this request was first accepted.
    pub received_at: DateTime<Utc>,
}

/// Fixed-window counter for one `(op, scope_key)` pair.
///
/// `window_key` is an ISO minute (`YYYY-MM-DDTHH:MM`); each call
/// atomically increments and reads the new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCounter {
    /// Operation family being limited.
    pub op: String,
    /// Caller/tenant scope key.
    pub scope_key: String,
    /// The ISO-minute window this count belongs to.
    pub window_key: String,
    /// Number of calls observed in this window so far.
    pub count: u64,
}

/// Daily quota usage for one `(op, scope_key)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDaily {
    /// Operation family being limited.
    pub op: String,
    /// Caller/tenant scope key.
    pub scope_key: String,
    /// Day this usage belongs to (`YYYY-MM-DD`).
    pub day_key: String,
    /// Calls used so far today.
    pub used: u64,
    /// Threshold above which calls are still allowed but flagged
    /// `soft_warn`.
    pub soft_limit: u64,
    /// Threshold at which calls are denied.
    pub hard_limit: u64,
}

/// Circuit breaker state for one upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerState {
    /// Calls are allowed; failures accumulate toward `open_after_fails`.
    Closed,
    /// Calls are denied until `cooldown_sec` elapses from `opened_at`.
    Open,
    /// One probe call is allowed per `cooldown_sec`.
    HalfOpen,
}

/// Circuit breaker for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breaker {
    /// Provider this breaker guards.
    pub provider: String,
    /// Current state.
    pub state: BreakerState,
    /// Consecutive failures observed in the current window.
    pub fail_count: u32,
    /// When the most recent failure was recorded.
    pub last_fail_at: Option<DateTime<Utc>>,
    /// When the breaker most recently transitioned to `Open`.
    pub opened_at: Option<DateTime<Utc>>,
    /// When the most recent `HalfOpen` probe was issued.
    pub last_probe_at: Option<DateTime<Utc>>,
}

/// Append-only denial log entry, written for every limits denial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitDenial {
    /// Operation family that was denied.
    pub op: String,
    /// Caller/tenant scope key.
    pub scope_key: String,
    /// Deny code (`RATE_LIMIT_EXCEEDED`, `DAILY_QUOTA_EXCEEDED`, ...).
    pub code: String,
    /// When the denial was recorded.
    pub created_at: DateTime<Utc>,
}
