//! NanoClaw Ops HTTP API (spec.md §6): read-only introspection over
//! governance tasks, products, workers, approvals, and memories; an SSE
//! stream of the same [`nanoclaw_core::NanoClawEvent`]s the other
//! components publish; a rate-limited governance write action; and the
//! inbound, HMAC-verified worker completion callback that the
//! governance loop's `DOING -> REVIEW` transition hangs off of.
//!
//! Every introspection and write route sits behind a fail-closed
//! secret-header layer ([`middleware`]); the worker completion route
//! carries its own per-worker HMAC instead.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod prelude;
pub mod routes;
pub mod sse;
pub mod state;
pub mod worker_completion;

pub use config::OpsConfig;
pub use error::{OpsError, OpsResult};
pub use routes::router;
pub use state::AppState;
