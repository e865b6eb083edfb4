//! Per-operation limit configuration (spec.md §4.B).
//!
//! Configuration is looked up by operation name (`"send_message"`,
//! `"mem_store"`, `"llm_call"`, ...) and is expected to be assembled once
//! at startup from [`nanoclaw_config`] and handed to [`crate::engine::
//! LimitsEngine::new`].

use std::collections::HashMap;

use crate::breaker::BreakerConfig;

/// Per-minute rate limit for one operation.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Calls allowed per one-minute window. Zero means the operation is
    /// not authorized at all.
    pub per_minute: u32,
}

impl RateLimitConfig {
    /// A zero-valued rate means "not authorized", per spec.md §4.B.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.per_minute > 0
    }
}

/// Daily soft/hard quota for one operation.
#[derive(Debug, Clone, Copy)]
pub struct QuotaConfig {
    /// Usage count at which a soft warning is attached but the call still
    /// proceeds.
    pub soft_limit: u32,
    /// Usage count at which the call is denied outright. Zero means the
    /// operation is not authorized at all.
    pub hard_limit: u32,
}

impl QuotaConfig {
    /// A zero-valued hard limit means "not authorized", per spec.md §4.B.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.hard_limit > 0
    }
}

/// Configuration for a single operation family.
#[derive(Debug, Clone, Copy)]
pub struct OpConfig {
    /// Whether enforcement for this op is enabled at all (the kill
    /// switch). When `false`, every call is denied with `LimitsDisabled`.
    pub enabled: bool,
    /// Per-minute rate limit.
    pub rate: RateLimitConfig,
    /// Daily quota.
    pub quota: QuotaConfig,
    /// Circuit breaker tunables, if this op talks to an upstream
    /// provider that should be breaker-guarded.
    pub breaker: Option<BreakerConfig>,
}

/// The full set of per-op configurations known to one [`crate::engine::
/// LimitsEngine`] instance.
#[derive(Debug, Clone, Default)]
pub struct LimitsConfig {
    ops: HashMap<String, OpConfig>,
}

impl LimitsConfig {
    /// An empty configuration; every op is unconfigured until registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register configuration for one operation, replacing any existing
    /// entry under the same name.
    pub fn register(&mut self, op: impl Into<String>, config: OpConfig) -> &mut Self {
        self.ops.insert(op.into(), config);
        self
    }

    /// Builder-style variant of [`Self::register`].
    #[must_use]
    pub fn with(mut self, op: impl Into<String>, config: OpConfig) -> Self {
        self.register(op, config);
        self
    }

    /// Look up the configuration for one operation.
    #[must_use]
    pub fn get(&self, op: &str) -> Option<&OpConfig> {
        self.ops.get(op)
    }

    /// Build a configuration from the `RL_<OP>_PER_MIN` /
    /// `QUOTA_<OP>_{SOFT,HARD}` environment variables (spec.md §6), one
    /// triple per operation named in `ops`. `enabled` gates every
    /// registered op at once (the `LIMITS_ENABLED` kill switch is applied
    /// upstream, at the engine, not per-op here). Operations listed in
    /// `breaker_ops` additionally pick up a single breaker built from the
    /// global `BREAK_OPEN_AFTER_FAILS`/`BREAK_FAIL_WINDOW_SEC`/
    /// `BREAK_COOLDOWN_SEC` trio, since the source data does not carry a
    /// per-provider breaker tunable - only operations that call out to an
    /// external provider need one at all.
    #[must_use]
    pub fn from_env(env: &HashMap<String, String>, ops: &[&str], breaker_ops: &[&str], enabled: bool) -> Self {
        let breaker = Self::breaker_from_env(env);
        let mut config = Self::new();
        for op in ops {
            let upper = op.to_uppercase();
            let per_minute = env
                .get(&format!("RL_{upper}_PER_MIN"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let soft_limit = env
                .get(&format!("QUOTA_{upper}_SOFT"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let hard_limit = env
                .get(&format!("QUOTA_{upper}_HARD"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            config.register(
                *op,
                OpConfig {
                    enabled,
                    rate: RateLimitConfig { per_minute },
                    quota: QuotaConfig { soft_limit, hard_limit },
                    breaker: if breaker_ops.contains(op) { breaker } else { None },
                },
            );
        }
        config
    }

    fn breaker_from_env(env: &HashMap<String, String>) -> Option<BreakerConfig> {
        let open_after_fails = env.get("BREAK_OPEN_AFTER_FAILS")?.parse().ok()?;
        let fail_window_sec = env.get("BREAK_FAIL_WINDOW_SEC")?.parse().ok()?;
        let cooldown_sec = env.get("BREAK_COOLDOWN_SEC")?.parse().ok()?;
        Some(BreakerConfig {
            open_after_fails,
            fail_window_sec,
            cooldown_sec,
        })
    }
}
