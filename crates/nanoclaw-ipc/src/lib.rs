//! NanoClaw IPC - the filesystem request/response transport between the
//! host and isolated agent workers (spec.md §4.C).
//!
//! A per-group directory tree ([`layout::GroupIpcPaths`]) carries
//! agent→host task requests (`tasks/`), agent→host outbound messages
//! (`messages/`), host→agent responses (`responses/<request_id>.json`),
//! and host→agent follow-up input (`input/`). Every write goes through
//! the tmp+rename atomic protocol in [`writer`]; [`watcher`] polls each
//! directory oldest-first and quarantines files that fail to parse or
//! handle. [`handlers`] replaces a `switch (data.type)` over `tasks/`
//! requests with a registry from [`broker::IpcTaskKind`] to a handler
//! capability; [`snapshot`] writes the periodic `current_tasks.json`/
//! `gov_pipeline.json`/`ext_capabilities.json` views a group's agent reads.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod broker;
pub mod error;
pub mod filename;
pub mod handlers;
pub mod layout;
pub mod session_input;
pub mod snapshot;
pub mod watcher;
pub mod writer;

pub use broker::{await_response, require_field, require_main, respond, IpcTask, IpcTaskKind};
pub use error::{IpcError, IpcResult};
pub use handlers::{drain_tasks_once, process_file, HandlerTable, TaskHandler};
pub use layout::GroupIpcPaths;
pub use session_input::{push_close, push_input};
pub use snapshot::{write_current_tasks, write_ext_capabilities, write_gov_pipeline};
pub use watcher::{quarantine, scan_sorted};
pub use writer::{write_bytes_atomic, write_json_atomic};
