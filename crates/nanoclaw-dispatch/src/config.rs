//! Dispatcher tunables (spec.md §4.E, §6).

use std::time::Duration;

/// Tunables for worker selection, dispatch, and the health loop.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How often the health loop polls `/worker/health` for each worker.
    pub health_interval: Duration,
    /// Consecutive health-check failures before a worker is marked
    /// offline.
    pub health_failure_threshold: u32,
    /// HTTP request timeout for dispatch/health calls.
    pub request_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_millis(15_000),
            health_failure_threshold: 3,
            request_timeout: Duration::from_secs(10),
        }
    }
}
