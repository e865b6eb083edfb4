//! NanoClaw Memory - the Memory Broker component (spec.md §4.I).
//!
//! Handles `mem_store` and `mem_recall` IPC requests: PII/injection
//! scanning, level classification, content hashing, and level/scope/
//! product-filtered recall with a full access log.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod broker;
mod classify;
mod error;
mod scan;

pub use broker::MemoryBroker;
pub use classify::{classify as classify_level, content_hash};
pub use error::{MemoryError, MemoryResult};
pub use scan::scan as scan_content;
