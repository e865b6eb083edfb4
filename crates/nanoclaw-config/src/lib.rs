//! NanoClaw Config - layered configuration loading for the NanoClaw host.
//!
//! Loads, in order: [`types::Config::default`], an optional TOML file, then
//! recognized environment variables (spec.md §6). All types are
//! self-contained with no dependency on other internal NanoClaw crates, so
//! this crate can be loaded before anything else is wired up.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{limits_env_vars, load, load_with};
pub use types::{
    Config, GroupsSection, IpcSection, LimitsSection, OpsSection, RouterSection, RuntimeSection,
    SchedulerSection, StorageSection, WorkerSection,
};
