//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_config::prelude::*;` to import all essential types.

pub use crate::{ConfigError, ConfigResult};
pub use crate::{limits_env_vars, load, load_with};
pub use crate::{
    Config, GroupsSection, IpcSection, LimitsSection, OpsSection, RouterSection, RuntimeSection,
    SchedulerSection, StorageSection, WorkerSection,
};
