//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_limits::prelude::*;` to import all essential types.

pub use crate::{LimitsError, LimitsResult};

pub use crate::{Decision, DenyCode, LimitContext};

pub use crate::{LimitsConfig, OpConfig, QuotaConfig, RateLimitConfig};

pub use crate::{Admission, BreakerConfig};

pub use crate::LimitsEngine;
