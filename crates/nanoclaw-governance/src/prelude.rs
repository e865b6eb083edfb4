//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_governance::prelude::*;` to import all essential
//! types.

pub use crate::{GovernanceError, GovernanceResult};

pub use crate::{run_governance_loop, GovernanceConfig, GovernanceDeps};

pub use crate::{approvals, callback, context_pack, transitions, triage};
