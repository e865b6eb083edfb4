//! HMAC-SHA256 signing of outbound worker requests (spec.md §4.D).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The three headers a signed worker request carries.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// `X-Worker-HMAC`: hex-encoded HMAC-SHA256 digest.
    pub hmac: String,
    /// `X-Worker-Timestamp`: milliseconds since the Unix epoch, as a string.
    pub timestamp: String,
    /// `X-Worker-RequestId`: the caller-chosen request identifier.
    pub request_id: String,
}

fn signing_message(timestamp: &str, request_id: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + request_id.len() + body.len() + 2);
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(request_id.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

/// Sign `body` with `shared_secret` under `request_id` at `timestamp_ms`,
/// producing the header set to attach to the outbound HTTP request.
#[must_use]
pub fn sign(
    shared_secret: &[u8],
    request_id: impl Into<String>,
    timestamp_ms: i64,
    body: &[u8],
) -> SignedHeaders {
    let request_id = request_id.into();
    let timestamp = timestamp_ms.to_string();
    let message = signing_message(&timestamp, &request_id, body);

    let mut mac =
        HmacSha256::new_from_slice(shared_secret).expect("HMAC accepts keys of any length");
    mac.update(&message);
    let digest = mac.finalize().into_bytes();

    SignedHeaders {
        hmac: hex::encode(digest),
        timestamp,
        request_id,
    }
}

pub(crate) fn expected_hmac(shared_secret: &[u8], timestamp: &str, request_id: &str, body: &[u8]) -> Vec<u8> {
    let message = signing_message(timestamp, request_id, body);
    let mut mac =
        HmacSha256::new_from_slice(shared_secret).expect("HMAC accepts keys of any length");
    mac.update(&message);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic_for_same_inputs() {
        let a = sign(b"secret", "req-1", 1_000, b"{}");
        let b = sign(b"secret", "req-1", 1_000, b"{}");
        assert_eq!(a.hmac, b.hmac);
    }

    #[test]
    fn test_sign_differs_when_body_changes() {
        let a = sign(b"secret", "req-1", 1_000, b"{\"a\":1}");
        let b = sign(b"secret", "req-1", 1_000, b"{\"a\":2}");
        assert_ne!(a.hmac, b.hmac);
    }

    #[test]
    fn test_sign_differs_across_request_ids() {
        let a = sign(b"secret", "req-1", 1_000, b"{}");
        let b = sign(b"secret", "req-2", 1_000, b"{}");
        assert_ne!(a.hmac, b.hmac);
    }
}
