//! The six-step inbound verification pipeline (spec.md §4.D).

use nanoclaw_core::Nonce;
use nanoclaw_storage::LimitsRepository;
use subtle::ConstantTimeEq;

use crate::error::{AuthError, AuthResult, VerifyError};
use crate::signer::expected_hmac;

/// Raw, unverified headers lifted off an inbound worker request.
#[derive(Debug, Clone, Default)]
pub struct InboundHeaders {
    /// `X-Worker-HMAC`, if present.
    pub hmac: Option<String>,
    /// `X-Worker-Timestamp`, if present.
    pub timestamp: Option<String>,
    /// `X-Worker-RequestId`, if present.
    pub request_id: Option<String>,
}

/// Tunables for one verifier instance.
#[derive(Debug, Clone, Copy)]
pub struct VerifierConfig {
    /// Maximum allowed clock skew, in milliseconds, between the signer's
    /// timestamp and the verifier's own clock.
    pub ttl_ms: i64,
}

/// Verifies inbound worker requests against a shared secret and a nonce
/// store, in the fixed six-step order from spec.md §4.D.
pub struct Verifier<'a> {
    repo: LimitsRepository<'a>,
    config: VerifierConfig,
}

impl<'a> Verifier<'a> {
    /// Build a verifier over a nonce repository and its TTL config.
    #[must_use]
    pub fn new(repo: LimitsRepository<'a>, config: VerifierConfig) -> Self {
        Self { repo, config }
    }

    /// Verify one inbound request. `now_ms` is the verifier's current
    /// time in milliseconds since the Unix epoch.
    pub async fn verify(
        &self,
        headers: &InboundHeaders,
        shared_secret: &[u8],
        body: &[u8],
        now_ms: i64,
    ) -> AuthResult<()> {
        let (hmac_hex, timestamp_raw, request_id) = match (
            &headers.hmac,
            &headers.timestamp,
            &headers.request_id,
        ) {
            (Some(h), Some(t), Some(r)) => (h, t, r),
            _ => return Err(AuthError::from(VerifyError::MissingHeaders)),
        };

        let timestamp_ms: i64 = timestamp_raw
            .parse()
            .map_err(|_| AuthError::from(VerifyError::InvalidTimestamp))?;

        if (now_ms - timestamp_ms).abs() > self.config.ttl_ms {
            return Err(AuthError::from(VerifyError::TtlExpired));
        }

        let received_at = chrono::DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_else(chrono::Utc::now);

        let expected = expected_hmac(shared_secret, timestamp_raw, request_id, body);
        let provided = hex::decode(hmac_hex).map_err(|_| AuthError::from(VerifyError::HmacInvalid))?;

        // Claim the nonce first so a replayed request observes
        // `ReplayDetected` even if it races a legitimate first attempt;
        // only after a successful claim do we compare the HMAC, so a
        // wrong-signature request never burns the nonce slot.
        let claim = self
            .repo
            .claim_nonce(&Nonce {
                request_id: request_id.clone(),
                received_at,
            })
            .await;

        match claim {
            Ok(()) => {}
            Err(nanoclaw_storage::StorageError::AlreadyClaimed(_)) => {
                return Err(AuthError::from(VerifyError::ReplayDetected));
            }
            Err(other) => return Err(AuthError::from(other)),
        }

        if expected.ct_eq(&provided).into() {
            Ok(())
        } else {
            Err(AuthError::from(VerifyError::HmacInvalid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::sign;
    use nanoclaw_storage::{Database, MemoryKvStore, Store};
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn headers_from(signed: &crate::signer::SignedHeaders) -> InboundHeaders {
        InboundHeaders {
            hmac: Some(signed.hmac.clone()),
            timestamp: Some(signed.timestamp.clone()),
            request_id: Some(signed.request_id.clone()),
        }
    }

    #[tokio::test]
    async fn test_valid_request_verifies() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let body = b"{\"task\":\"x\"}";
        let signed = sign(b"secret", "req-1", 1_000_000, body);
        let headers = headers_from(&signed);

        verifier.verify(&headers, b"secret", body, 1_000_500).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_headers_rejected() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let headers = InboundHeaders::default();
        let result = verifier.verify(&headers, b"secret", b"{}", 0).await;
        assert!(matches!(result, Err(AuthError::Verify(VerifyError::MissingHeaders))));
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_rejected() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let headers = InboundHeaders {
            hmac: Some("abcd".to_string()),
            timestamp: Some("not-a-number".to_string()),
            request_id: Some("req-1".to_string()),
        };
        let result = verifier.verify(&headers, b"secret", b"{}", 0).await;
        assert!(matches!(result, Err(AuthError::Verify(VerifyError::InvalidTimestamp))));
    }

    #[tokio::test]
    async fn test_expired_ttl_rejected() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let body = b"{}";
        let signed = sign(b"secret", "req-1", 0, body);
        let headers = headers_from(&signed);

        let result = verifier.verify(&headers, b"secret", body, 200_000).await;
        assert!(matches!(result, Err(AuthError::Verify(VerifyError::TtlExpired))));
    }

    #[tokio::test]
    async fn test_replay_rejected() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let body = b"{}";
        let signed = sign(b"secret", "req-1", 1_000_000, body);
        let headers = headers_from(&signed);

        verifier.verify(&headers, b"secret", body, 1_000_000).await.unwrap();
        let replay = verifier.verify(&headers, b"secret", body, 1_000_100).await;
        assert!(matches!(replay, Err(AuthError::Verify(VerifyError::ReplayDetected))));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected_as_hmac_invalid() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let verifier = Verifier::new(repo, VerifierConfig { ttl_ms: 60_000 });

        let body = b"{}";
        let signed = sign(b"secret", "req-1", 1_000_000, body);
        let headers = headers_from(&signed);

        let result = verifier.verify(&headers, b"wrong-secret", body, 1_000_000).await;
        assert!(matches!(result, Err(AuthError::Verify(VerifyError::HmacInvalid))));
    }
}
