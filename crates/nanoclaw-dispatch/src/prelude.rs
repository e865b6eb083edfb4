//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_dispatch::prelude::*;` to import all essential types.

pub use crate::{DispatchError, DispatchResult};

pub use crate::{DispatchConfig, WorkerDispatcher, WorkerHttpClient, WorkerSelector};

pub use crate::{run_health_loop, HealthDeps};
