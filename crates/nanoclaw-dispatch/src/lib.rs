//! NanoClaw Worker Fleet Dispatcher (spec.md §4.E).
//!
//! Selects an online worker with spare WIP capacity serving the target
//! group ([`selector::WorkerSelector`], deny-by-default), claims capacity
//! and posts an HMAC-signed dispatch over the worker's loopback tunnel
//! ([`dispatcher::WorkerDispatcher`], [`client::WorkerHttpClient`]), and
//! runs a periodic health loop that flips workers offline after three
//! consecutive unreachable checks ([`health::run_health_loop`]).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod prelude;
pub mod selector;

pub use client::WorkerHttpClient;
pub use config::DispatchConfig;
pub use dispatcher::WorkerDispatcher;
pub use error::{DispatchError, DispatchResult};
pub use health::{run_health_loop, HealthDeps};
pub use selector::WorkerSelector;
