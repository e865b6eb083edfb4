//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_auth::prelude::*;` to import all essential types.

pub use crate::{AuthError, AuthResult, VerifyError};

pub use crate::{sign, SignedHeaders};

pub use crate::{InboundHeaders, Verifier, VerifierConfig};

pub use crate::{sweep_once, JanitorConfig};
