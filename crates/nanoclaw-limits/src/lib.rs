//! Rate limit, daily quota, and circuit breaker enforcement.
//!
//! [`engine::LimitsEngine`] is the single entry point every limited
//! operation (agent turns, worker dispatch, memory writes, IPC calls)
//! runs through. It composes three independent mechanisms, checked in a
//! fixed order so a caller only ever receives one deny code per call:
//!
//! 1. A global per-operation kill switch and the "zero-valued limit
//!    means not authorized" rule ([`config`]).
//! 2. A circuit breaker per upstream provider ([`breaker`]).
//! 3. A per-minute rate counter and a daily soft/hard quota, both backed
//!    by [`nanoclaw_storage::LimitsRepository`].
//!
//! Every hard deny is appended to the denial log for `/ops/stats`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod breaker;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod prelude;

pub use breaker::{Admission, BreakerConfig};
pub use config::{LimitsConfig, OpConfig, QuotaConfig, RateLimitConfig};
pub use decision::{Decision, DenyCode, LimitContext};
pub use engine::LimitsEngine;
pub use error::{LimitsError, LimitsResult};
