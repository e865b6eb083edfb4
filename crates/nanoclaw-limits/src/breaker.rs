//! Circuit breaker state machine (spec.md §4.B).
//!
//! Pure transition functions over [`nanoclaw_core::Breaker`], kept free of
//! any storage concern so they can be unit tested directly; [`crate::
//! engine::LimitsEngine`] is responsible for loading/saving the row
//! around each call.

use chrono::{DateTime, Utc};
use nanoclaw_core::{Breaker, BreakerState};

/// Tunables for one provider's breaker.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures within `fail_window_sec` before tripping OPEN.
    pub open_after_fails: u32,
    /// Window, in seconds, over which failures are counted.
    pub fail_window_sec: i64,
    /// Seconds OPEN must persist before allowing a HALF_OPEN probe.
    pub cooldown_sec: i64,
}

/// Fresh CLOSED breaker for a provider that has never tripped.
#[must_use]
pub fn fresh(provider: impl Into<String>) -> Breaker {
    Breaker {
        provider: provider.into(),
        state: BreakerState::Closed,
        fail_count: 0,
        last_fail_at: None,
        opened_at: None,
        last_probe_at: None,
    }
}

/// Whether a call is currently allowed to proceed against this breaker,
/// and if the breaker must transition to admit a HALF_OPEN probe, the
/// breaker to persist before issuing the call.
pub enum Admission {
    /// The call may proceed; no state change was needed.
    Allow,
    /// The call may proceed as a HALF_OPEN probe; persist `next` first.
    AllowAsProbe {
        /// The breaker row to write before issuing the call.
        next: Breaker,
    },
    /// The call must be denied.
    Deny,
}

/// Decide whether a call may proceed, given the current breaker row and
/// the present time.
#[must_use]
pub fn admit(breaker: &Breaker, config: &BreakerConfig, now: DateTime<Utc>) -> Admission {
    match breaker.state {
        BreakerState::Closed => Admission::Allow,
        BreakerState::Open => {
            let opened_at = match breaker.opened_at {
                Some(t) => t,
                None => return Admission::Allow,
            };
            let elapsed = (now - opened_at).num_seconds();
            if elapsed >= config.cooldown_sec {
                let mut next = breaker.clone();
                next.state = BreakerState::HalfOpen;
                next.last_probe_at = Some(now);
                Admission::AllowAsProbe { next }
            } else {
                Admission::Deny
            }
        }
        BreakerState::HalfOpen => {
            // One probe per cooldown window: only allow if no probe has
            // been issued since the last cooldown boundary.
            match breaker.last_probe_at {
                Some(last) if (now - last).num_seconds() < config.cooldown_sec => Admission::Deny,
                _ => {
                    let mut next = breaker.clone();
                    next.last_probe_at = Some(now);
                    Admission::AllowAsProbe { next }
                }
            }
        }
    }
}

/// Record a successful call against this breaker.
#[must_use]
pub fn record_success(breaker: &Breaker) -> Breaker {
    let mut next = breaker.clone();
    next.state = BreakerState::Closed;
    next.fail_count = 0;
    next.opened_at = None;
    next.last_probe_at = None;
    next
}

/// Record a failed call against this breaker, tripping it OPEN if the
/// failure threshold is crossed within `fail_window_sec`.
#[must_use]
pub fn record_failure(breaker: &Breaker, config: &BreakerConfig, now: DateTime<Utc>) -> Breaker {
    let mut next = breaker.clone();

    if breaker.state == BreakerState::HalfOpen {
        // A failed probe re-enters OPEN immediately with a reset cooldown.
        next.state = BreakerState::Open;
        next.opened_at = Some(now);
        next.last_fail_at = Some(now);
        next.fail_count = config.open_after_fails;
        return next;
    }

    let within_window = breaker
        .last_fail_at
        .is_some_and(|last| (now - last).num_seconds() <= config.fail_window_sec);
    next.fail_count = if within_window { breaker.fail_count + 1 } else { 1 };
    next.last_fail_at = Some(now);

    if next.fail_count >= config.open_after_fails {
        next.state = BreakerState::Open;
        next.opened_at = Some(now);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config() -> BreakerConfig {
        BreakerConfig {
            open_after_fails: 3,
            fail_window_sec: 120,
            cooldown_sec: 5,
        }
    }

    #[test]
    fn test_trips_open_after_threshold_failures() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        for i in 0..3 {
            breaker = record_failure(&breaker, &config(), now + Duration::seconds(i));
        }
        assert_eq!(breaker.state, BreakerState::Open);
    }

    #[test]
    fn test_denies_while_open_before_cooldown() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        breaker.state = BreakerState::Open;
        breaker.opened_at = Some(now);

        let admission = admit(&breaker, &config(), now + Duration::seconds(3));
        assert!(matches!(admission, Admission::Deny));
    }

    #[test]
    fn test_allows_probe_after_cooldown() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        breaker.state = BreakerState::Open;
        breaker.opened_at = Some(now);

        let admission = admit(&breaker, &config(), now + Duration::seconds(6));
        assert!(matches!(admission, Admission::AllowAsProbe { .. }));
    }

    #[test]
    fn test_successful_probe_closes_breaker() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        breaker.state = BreakerState::HalfOpen;
        breaker.last_probe_at = Some(now);

        let closed = record_success(&breaker);
        assert_eq!(closed.state, BreakerState::Closed);
        assert_eq!(closed.fail_count, 0);
    }

    #[test]
    fn test_failed_probe_reopens_with_reset_cooldown() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        breaker.state = BreakerState::HalfOpen;
        breaker.last_probe_at = Some(now);

        let reopened = record_failure(&breaker, &config(), now + Duration::seconds(1));
        assert_eq!(reopened.state, BreakerState::Open);
        assert_eq!(reopened.opened_at, Some(now + Duration::seconds(1)));
    }

    #[test]
    fn test_failures_outside_window_do_not_accumulate() {
        let now = Utc::now();
        let mut breaker = fresh("anthropic");
        breaker = record_failure(&breaker, &config(), now);
        breaker = record_failure(&breaker, &config(), now + Duration::seconds(200));
        assert_eq!(breaker.fail_count, 1);
        assert_eq!(breaker.state, BreakerState::Closed);
    }
}
