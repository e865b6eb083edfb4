//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_ops::prelude::*;` to import all essential types.

pub use crate::{OpsConfig, OpsError, OpsResult};

pub use crate::state::AppState;

pub use crate::routes::router;
