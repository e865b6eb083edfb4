//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_ipc::prelude::*;` to import all essential types.

pub use crate::{IpcError, IpcResult};

pub use crate::{GroupIpcPaths, IpcTask, IpcTaskKind};

pub use crate::{await_response, require_field, require_main, respond};

pub use crate::{push_close, push_input};

pub use crate::{quarantine, scan_sorted};

pub use crate::{write_bytes_atomic, write_json_atomic};

pub use crate::{drain_tasks_once, process_file, HandlerTable, TaskHandler};

pub use crate::{write_current_tasks, write_ext_capabilities, write_gov_pipeline};
