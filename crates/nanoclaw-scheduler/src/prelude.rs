//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_scheduler::prelude::*;` to import all essential types.

pub use crate::{SchedulerError, SchedulerResult};

pub use crate::{apply_failure, apply_success, next_run_after};

pub use crate::{run_scheduler_loop, SchedulerDeps};
