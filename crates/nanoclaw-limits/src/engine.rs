//! The limits enforcement entry point (spec.md §4.B).

use chrono::{DateTime, Utc};
use nanoclaw_core::LimitDenial;
use nanoclaw_storage::LimitsRepository;

use crate::breaker::{self, Admission};
use crate::config::LimitsConfig;
use crate::decision::{Decision, DenyCode, LimitContext};
use crate::error::{LimitsError, LimitsResult};

/// Evaluates rate limits, daily quotas, and circuit breakers for every
/// limited operation, in a fixed short-circuit order: kill switch,
/// breaker, rate counter, daily quota.
pub struct LimitsEngine<'a> {
    repo: LimitsRepository<'a>,
    config: &'a LimitsConfig,
}

impl<'a> LimitsEngine<'a> {
    /// Build an engine over a repository and its configuration.
    #[must_use]
    pub fn new(repo: LimitsRepository<'a>, config: &'a LimitsConfig) -> Self {
        Self { repo, config }
    }

    /// Evaluate whether `op` may proceed for `context` at `now`.
    ///
    /// Every hard deny (and the `NotAuthorized` pseudo-deny for
    /// unconfigured ops) is written to the denial log before returning.
    pub async fn enforce(
        &self,
        op: &str,
        context: &LimitContext,
        now: DateTime<Utc>,
    ) -> LimitsResult<Decision> {
        let Some(op_config) = self.config.get(op) else {
            let decision = Decision::deny(DenyCode::NotAuthorized, format!("no limits configured for {op}"));
            self.log(op, context, &decision, now).await?;
            return Ok(decision);
        };

        if !op_config.enabled {
            let decision = Decision::deny(DenyCode::LimitsDisabled, format!("{op} is disabled"));
            self.log(op, context, &decision, now).await?;
            return Ok(decision);
        }

        if !op_config.rate.is_authorized() || !op_config.quota.is_authorized() {
            let decision = Decision::deny(DenyCode::NotAuthorized, format!("{op} has a zero-valued limit"));
            self.log(op, context, &decision, now).await?;
            return Ok(decision);
        }

        if let (Some(breaker_config), Some(provider)) = (&op_config.breaker, &context.provider) {
            let current = self
                .repo
                .get_breaker(provider)
                .await
                .map_err(LimitsError::from)?
                .unwrap_or_else(|| breaker::fresh(provider.clone()));

            match breaker::admit(&current, breaker_config, now) {
                Admission::Deny => {
                    let decision = Decision::deny(
                        DenyCode::ProviderBreakerOpen,
                        format!("breaker for {provider} is open"),
                    );
                    self.log(op, context, &decision, now).await?;
                    return Ok(decision);
                }
                Admission::AllowAsProbe { next } => {
                    self.repo.put_breaker(&next).await.map_err(LimitsError::from)?;
                }
                Admission::Allow => {}
            }
        }

        let window_key = now.format("%Y-%m-%dT%H:%M").to_string();
        let count = self
            .repo
            .increment_rate_counter(op, &context.scope_key, &window_key)
            .await
            .map_err(LimitsError::from)?;
        if count > u64::from(op_config.rate.per_minute) {
            let decision = Decision::deny(
                DenyCode::RateLimitExceeded,
                format!("{op} exceeded {} calls/minute", op_config.rate.per_minute),
            );
            self.log(op, context, &decision, now).await?;
            return Ok(decision);
        }

        let day_key = now.format("%Y-%m-%d").to_string();
        let quota = self
            .repo
            .increment_quota(
                op,
                &context.scope_key,
                &day_key,
                u64::from(op_config.quota.soft_limit),
                u64::from(op_config.quota.hard_limit),
            )
            .await
            .map_err(LimitsError::from)?;

        if quota.used > quota.hard_limit {
            let decision = Decision::deny(
                DenyCode::DailyQuotaExceeded,
                format!("{op} exceeded daily quota of {}", quota.hard_limit),
            );
            self.log(op, context, &decision, now).await?;
            return Ok(decision);
        }

        if quota.used >= quota.soft_limit {
            return Ok(Decision::allow_with_soft_warn(format!(
                "{op} has used {}/{} of today's quota",
                quota.used, quota.hard_limit
            )));
        }

        Ok(Decision::allow())
    }

    /// Record a successful provider call, closing a HALF_OPEN breaker or
    /// keeping a CLOSED one closed.
    pub async fn record_success(&self, provider: &str) -> LimitsResult<()> {
        let current = self
            .repo
            .get_breaker(provider)
            .await
            .map_err(LimitsError::from)?
            .unwrap_or_else(|| breaker::fresh(provider));
        self.repo
            .put_breaker(&breaker::record_success(&current))
            .await
            .map_err(LimitsError::from)
    }

    /// Record a failed provider call, possibly tripping the breaker open.
    pub async fn record_failure(
        &self,
        provider: &str,
        op: &str,
        now: DateTime<Utc>,
    ) -> LimitsResult<()> {
        let breaker_config = self
            .config
            .get(op)
            .and_then(|c| c.breaker)
            .ok_or_else(|| LimitsError::UnconfiguredOp(op.to_string()))?;
        let current = self
            .repo
            .get_breaker(provider)
            .await
            .map_err(LimitsError::from)?
            .unwrap_or_else(|| breaker::fresh(provider));
        self.repo
            .put_breaker(&breaker::record_failure(&current, &breaker_config, now))
            .await
            .map_err(LimitsError::from)
    }

    async fn log(
        &self,
        op: &str,
        context: &LimitContext,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> LimitsResult<()> {
        let Some(code) = decision.code else {
            return Ok(());
        };
        if decision.soft_warn {
            return Ok(());
        }
        self.repo
            .log_denial(&LimitDenial {
                op: op.to_string(),
                scope_key: context.scope_key.clone(),
                code: code.as_wire_str().to_string(),
                created_at: now,
            })
            .await
            .map_err(LimitsError::from)
    }
}
