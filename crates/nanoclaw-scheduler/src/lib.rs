//! NanoClaw Scheduler - fires `Task`s on their cron/interval/once
//! schedule (spec.md §4.F), sharing the router's agent lock so at most
//! one agent turn runs host-wide at a time.
//!
//! Each tick loads every task whose `next_run` has elapsed, defers (never
//! queues) any that lose the [`nanoclaw_router::AgentLock`] race, and for
//! the rest runs one labeled [`nanoclaw_router::AgentClient`] turn before
//! recomputing `next_run` or bumping the retry counter.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod schedule;
pub mod scheduler_loop;

pub use error::{SchedulerError, SchedulerResult};
pub use schedule::{apply_failure, apply_success, next_run_after};
pub use scheduler_loop::{run_scheduler_loop, SchedulerDeps};
