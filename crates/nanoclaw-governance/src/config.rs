//! Governance loop tunables (spec.md §4.G).

use std::collections::HashMap;
use std::time::Duration;

/// Per-group and tick-cadence configuration for the governance loop.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// Tick interval, defaulting to the scheduler's.
    pub poll_interval: Duration,
    /// Maximum concurrent `DOING` tasks per group. Groups absent from
    /// this map fall back to [`Self::default_wip_limit`].
    pub group_wip_limits: HashMap<String, u32>,
    /// WIP bound applied to a group with no explicit entry.
    pub default_wip_limit: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(60_000),
            group_wip_limits: HashMap::new(),
            default_wip_limit: 5,
        }
    }
}

impl GovernanceConfig {
    /// The WIP bound in effect for `group`.
    #[must_use]
    pub fn wip_limit(&self, group: &str) -> u32 {
        self.group_wip_limits
            .get(group)
            .copied()
            .unwrap_or(self.default_wip_limit)
    }
}
