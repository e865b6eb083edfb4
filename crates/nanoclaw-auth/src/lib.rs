//! HMAC-SHA256 worker authentication.
//!
//! Every `/worker/*` and `/ops/worker/*` HTTP endpoint is protected by a
//! shared-secret HMAC over `timestamp + "\n" + requestId + "\n" + body`,
//! carried in the `X-Worker-HMAC`/`X-Worker-Timestamp`/
//! `X-Worker-RequestId` headers. [`signer::sign`] produces those headers
//! for outbound calls; [`verifier::Verifier`] runs the six-step
//! verification pipeline on the way in; [`janitor`] keeps the nonce
//! table bounded.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod janitor;
pub mod prelude;
pub mod signer;
pub mod verifier;

pub use error::{AuthError, AuthResult, VerifyError};
pub use janitor::{sweep_once, JanitorConfig};
pub use signer::{sign, SignedHeaders};
pub use verifier::{InboundHeaders, Verifier, VerifierConfig};
