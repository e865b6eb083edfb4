//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_memory::prelude::*;` to import all essential types.

pub use crate::{MemoryError, MemoryResult};
pub use crate::{MemoryBroker, classify_level, content_hash, scan_content};
