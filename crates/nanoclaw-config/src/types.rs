//! Configuration types for the NanoClaw host.
//!
//! Every struct implements [`Default`] with safe production defaults, so a
//! bare `[section]` header in TOML (or no file at all) produces a working
//! configuration. Mirrors spec.md §6's environment variable table one field
//! at a time.

use serde::{Deserialize, Serialize};

/// Root configuration for the NanoClaw host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Router trigger detection and polling.
    pub router: RouterSection,
    /// Task scheduler tick interval.
    pub scheduler: SchedulerSection,
    /// IPC broker polling and secrets.
    pub ipc: IpcSection,
    /// Container/agent runtime bounds.
    pub runtime: RuntimeSection,
    /// Worker fleet authentication and nonce bookkeeping.
    pub worker: WorkerSection,
    /// Ops HTTP API secrets.
    pub ops: OpsSection,
    /// Limits engine kill switches and per-op thresholds.
    pub limits: LimitsSection,
    /// Filesystem layout.
    pub storage: StorageSection,
    /// Group (tenant) registry.
    pub groups: GroupsSection,
}

/// Router trigger detection and poll cadence (spec.md §4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    /// Trigger token matched case-insensitively, word-bounded, against
    /// inbound message batches. `ASSISTANT_NAME`.
    pub assistant_name: String,
    /// Router tick interval in milliseconds. `POLL_INTERVAL`.
    pub poll_interval_ms: u64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            assistant_name: "Andy".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

/// Scheduler tick cadence (spec.md §4.F). `SCHEDULER_POLL_INTERVAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Tick interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Timezone used for cron evaluation. `TZ`.
    pub timezone: String,
    /// Retry attempts before a task moves to the failed sentinel state.
    pub max_attempts: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 60_000,
            timezone: "UTC".to_string(),
            max_attempts: 5,
        }
    }
}

/// IPC broker poll cadence (spec.md §4.C). `IPC_POLL_INTERVAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcSection {
    /// Directory poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Agent-side response wait bound in milliseconds.
    pub response_timeout_ms: u64,
}

impl Default for IpcSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            response_timeout_ms: 20_000,
        }
    }
}

/// Agent/container execution bounds (spec.md §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Maximum time a running agent is given to drain on shutdown, in
    /// seconds. `CONTAINER_TIMEOUT`.
    pub container_timeout_sec: u64,
    /// Idle container teardown bound, in seconds. `IDLE_TIMEOUT`.
    pub idle_timeout_sec: u64,
    /// Maximum number of concurrent agent containers.
    /// `MAX_CONCURRENT_CONTAINERS`.
    pub max_concurrent_containers: u32,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            container_timeout_sec: 1800,
            idle_timeout_sec: 300,
            max_concurrent_containers: 4,
        }
    }
}

/// Worker fleet HTTP and nonce configuration (spec.md §4.D, §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    /// Local port the host's worker-facing HTTP surface binds to.
    /// `WORKER_PORT`.
    pub port: u16,
    /// Fallback shared secret used when a `Worker` row carries none.
    /// `WORKER_SHARED_SECRET`.
    pub shared_secret: Option<String>,
    /// HMAC timestamp tolerance in milliseconds. `NONCE_TTL_MS`.
    pub nonce_ttl_ms: i64,
    /// Maximum number of retained nonce rows. `NONCE_CAP`.
    pub nonce_cap: u64,
    /// Nonce janitor sweep interval in milliseconds.
    /// `NONCE_CLEANUP_INTERVAL_MS`.
    pub nonce_cleanup_interval_ms: u64,
    /// Health-check poll interval in milliseconds.
    pub health_interval_ms: u64,
    /// Consecutive health failures before a worker is marked offline.
    pub health_failure_threshold: u32,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            port: 8787,
            shared_secret: None,
            nonce_ttl_ms: 60_000,
            nonce_cap: 10_000,
            nonce_cleanup_interval_ms: 60_000,
            health_interval_ms: 15_000,
            health_failure_threshold: 3,
        }
    }
}

/// Ops HTTP API secrets (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsSection {
    /// Read-access secret, required via `X-OS-SECRET`. `OS_HTTP_SECRET`.
    /// Unset means the API is unreachable (fail-closed).
    pub http_secret: Option<String>,
    /// Current write-access secret. `COCKPIT_WRITE_SECRET_CURRENT`.
    pub write_secret_current: Option<String>,
    /// Previous write-access secret, accepted during rotation.
    /// `COCKPIT_WRITE_SECRET_PREVIOUS`.
    pub write_secret_previous: Option<String>,
    /// Bind address for the ops HTTP server.
    pub bind_addr: String,
}

impl Default for OpsSection {
    fn default() -> Self {
        Self {
            http_secret: None,
            write_secret_current: None,
            write_secret_previous: None,
            bind_addr: "0.0.0.0:8788".to_string(),
        }
    }
}

/// Limits engine kill switches (spec.md §4.B). Per-operation numeric
/// thresholds (`RL_*_PER_MIN_*`, `QUOTA_*_{SOFT,HARD}_*`, `BREAK_*`) are
/// read directly by `nanoclaw-limits`'s own config builder, not mirrored
/// here, since the operation set is open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    /// Global kill switch for the limits engine. `LIMITS_ENABLED`.
    pub enabled: bool,
    /// Kill switch for external-provider calls. `EXT_CALLS_ENABLED`.
    pub ext_calls_enabled: bool,
    /// Kill switch for embeddings calls. `EMBEDDINGS_ENABLED`.
    pub embeddings_enabled: bool,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ext_calls_enabled: true,
            embeddings_enabled: true,
        }
    }
}

/// Filesystem layout (spec.md §6, persisted state layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root data directory containing the database and per-group IPC
    /// subtrees.
    pub data_dir: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

/// Group (tenant) registry (spec.md's Glossary: "Group", "Main group").
/// Not itself part of spec.md §6's environment variable table - the
/// source's group list is ordinarily discovered from its CLAUDE.md-per-
/// group directory layout; here it is a flat, file-configured list since
/// that discovery mechanism is out of this core's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsSection {
    /// The privileged group allowed tenant-wide operations (L3 memory
    /// access, unfiltered context packs).
    pub main_group: String,
    /// Every group this host serves an IPC tree and snapshot job for.
    /// `main_group` need not be repeated here; it is always included.
    pub groups: Vec<String>,
}

impl Default for GroupsSection {
    fn default() -> Self {
        Self {
            main_group: "main".to_string(),
            groups: vec!["main".to_string()],
        }
    }
}

impl GroupsSection {
    /// Every served group, with `main_group` guaranteed present exactly
    /// once.
    #[must_use]
    pub fn all_groups(&self) -> Vec<String> {
        let mut all = self.groups.clone();
        if !all.iter().any(|g| g == &self.main_group) {
            all.push(self.main_group.clone());
        }
        all
    }
}
