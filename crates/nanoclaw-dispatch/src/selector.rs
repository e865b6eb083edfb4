//! Eligible-worker selection with a round-robin cursor (spec.md §4.E).
//!
//! Deny-by-default: a worker is a candidate only when `Worker::is_eligible`
//! holds (online, has spare WIP, serves the target group). The cursor is
//! process-lifetime state — an explicit, lifetimed component rather than a
//! module-level singleton, per spec.md §9's redesign note on global
//! mutable state.

use std::collections::HashMap;
use std::sync::Mutex;

use nanoclaw_core::Worker;

/// Tracks one round-robin cursor per group, so repeated dispatches to the
/// same group rotate across its eligible workers instead of always
/// hitting the first one.
#[derive(Default)]
pub struct WorkerSelector {
    cursors: Mutex<HashMap<String, usize>>,
}

impl WorkerSelector {
    /// Build a selector with no prior rotation state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the next eligible worker for `group` out of `fleet`,
    /// advancing that group's rotation cursor. Returns `None` if no
    /// worker in `fleet` is currently eligible.
    #[must_use]
    pub fn select<'a>(&self, group: &str, fleet: &'a [Worker]) -> Option<&'a Worker> {
        let eligible: Vec<&Worker> = fleet.iter().filter(|w| w.is_eligible(group)).collect();
        if eligible.is_empty() {
            return None;
        }

        let mut cursors = self.cursors.lock().expect("selector mutex poisoned");
        let cursor = cursors.entry(group.to_string()).or_insert(0);
        let chosen = eligible[*cursor % eligible.len()];
        *cursor = (*cursor + 1) % eligible.len();
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::{WorkerId, WorkerStatus};

    fn worker(id: &str, groups: &[&str]) -> Worker {
        Worker {
            id: WorkerId::new(id),
            host: "10.0.0.1".to_string(),
            user: "nanoclaw".to_string(),
            ssh_port: 22,
            local_port: 9100,
            remote_port: 8080,
            status: WorkerStatus::Online,
            max_wip: 2,
            current_wip: 0,
            shared_secret: "secret".to_string(),
            groups_served: groups.iter().map(|s| s.to_string()).collect(),
            consecutive_failures: 0,
        }
    }

    #[test]
    fn test_select_none_when_no_candidates() {
        let selector = WorkerSelector::new();
        let fleet = vec![worker("w1", &["designer"])];
        assert!(selector.select("developer", &fleet).is_none());
    }

    #[test]
    fn test_select_rotates_round_robin() {
        let selector = WorkerSelector::new();
        let fleet = vec![worker("w1", &["developer"]), worker("w2", &["developer"])];

        let first = selector.select("developer", &fleet).unwrap().id.clone();
        let second = selector.select("developer", &fleet).unwrap().id.clone();
        let third = selector.select("developer", &fleet).unwrap().id.clone();

        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_select_skips_ineligible_workers() {
        let selector = WorkerSelector::new();
        let mut full = worker("w1", &["developer"]);
        full.current_wip = full.max_wip;
        let fleet = vec![full, worker("w2", &["developer"])];

        let chosen = selector.select("developer", &fleet).unwrap();
        assert_eq!(chosen.id, WorkerId::new("w2"));
    }

    #[test]
    fn test_separate_groups_rotate_independently() {
        let selector = WorkerSelector::new();
        let fleet = vec![
            worker("w1", &["developer", "designer"]),
            worker("w2", &["developer", "designer"]),
        ];

        let dev_first = selector.select("developer", &fleet).unwrap().id.clone();
        let design_first = selector.select("designer", &fleet).unwrap().id.clone();
        assert_eq!(dev_first, design_first);
    }
}
