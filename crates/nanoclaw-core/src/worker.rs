//! Worker fleet data model (owned by the Worker Dispatcher).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{GovTaskId, GroupFolder, WorkerId};

/// Reachability of a fleet worker, as tracked by the dispatcher's health
/// loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Passed its most recent health checks; eligible for dispatch.
    Online,
    /// Failed three consecutive health checks; dispatch suspended.
    Offline,
}

/// A remote execution node reachable over a loopback SSH tunnel.
///
/// Deny-by-default: a worker serves a group only if the group appears in
/// `groups_served`; a null, empty, or otherwise invalid `groups_served`
/// list means the worker serves no groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    /// Unique identifier.
    pub id: WorkerId,
    /// SSH host.
    pub host: String,
    /// SSH user.
    pub user: String,
    /// Remote SSH port.
    pub ssh_port: u16,
    /// Local end of the loopback port forward NanoClaw dispatches through.
    pub local_port: u16,
    /// Remote port the worker's HTTP server listens on.
    pub remote_port: u16,
    /// Current reachability.
    pub status: WorkerStatus,
    /// Maximum concurrent in-flight dispatches.
    pub max_wip: u32,
    /// Current in-flight dispatch count.
    pub current_wip: u32,
    /// Per-worker HMAC shared secret.
    pub shared_secret: String,
    /// Groups this worker is authorized to serve. Deny-by-default when
    /// empty.
    pub groups_served: Vec<String>,
    /// Consecutive health-check failures since the last success.
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl Worker {
    /// Whether this worker is authorized to serve `group`.
    #[must_use]
    pub fn serves_group(&self, group: &str) -> bool {
        self.groups_served.iter().any(|g| g == group)
    }

    /// Whether this worker has spare capacity right now.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.current_wip < self.max_wip
    }

    /// Whether this worker is eligible to receive a dispatch for `group`.
    #[must_use]
    pub fn is_eligible(&self, group: &str) -> bool {
        self.status == WorkerStatus::Online && self.has_capacity() && self.serves_group(group)
    }
}

/// Body of an outbound `POST /worker/dispatch` call (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// The governed task being dispatched.
    pub task_id: GovTaskId,
    /// The tenant group folder this task is assigned to.
    pub group_folder: GroupFolder,
    /// The idempotency key claimed for this transition.
    pub dispatch_key: String,
    /// The context pack built for this dispatch (task, activities,
    /// approvals, filtered memories).
    pub context_pack: Value,
}

/// Reply to a `GET /worker/health` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReply {
    /// Free-form worker-reported status string.
    pub status: String,
    /// How long the worker process has been running.
    pub uptime_seconds: u64,
    /// Number of tasks currently executing on the worker.
    pub active_tasks: u32,
}

/// Body of an inbound `POST /ops/worker/completion` callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCallback {
    /// The governed task that finished.
    pub task_id: GovTaskId,
    /// The tenant group folder the task ran under.
    pub group_folder: GroupFolder,
    /// Worker-reported completion status.
    pub status: CompletionStatus,
    /// Free-form execution summary, attached to the task's activity log.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Worker-reported outcome of a dispatched execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// The task finished successfully.
    Success,
    /// The task failed.
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(groups: Vec<&str>) -> Worker {
        Worker {
            id: WorkerId::new("w1"),
            host: "10.0.0.1".to_string(),
            user: "nanoclaw".to_string(),
            ssh_port: 22,
            local_port: 9100,
            remote_port: 8080,
            status: WorkerStatus::Online,
            max_wip: 2,
            current_wip: 0,
            shared_secret: "secret".to_string(),
            groups_served: groups.into_iter().map(String::from).collect(),
            consecutive_failures: 0,
        }
    }

    #[test]
    fn test_deny_by_default_on_empty_groups() {
        let worker = sample(vec![]);
        assert!(!worker.serves_group("developer"));
        assert!(!worker.is_eligible("developer"));
    }

    #[test]
    fn test_eligible_requires_capacity_and_online() {
        let mut worker = sample(vec!["developer"]);
        assert!(worker.is_eligible("developer"));

        worker.current_wip = worker.max_wip;
        assert!(!worker.is_eligible("developer"));

        worker.current_wip = 0;
        worker.status = WorkerStatus::Offline;
        assert!(!worker.is_eligible("developer"));
    }
}
