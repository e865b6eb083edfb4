//! Content hashing and level classification (spec.md §4.I, `mem_store`).

use nanoclaw_core::{ContentScan, MemoryLevel};
use sha2::{Digest, Sha256};

/// Hash `content` for the `content_hash` field, so repeated stores of
/// identical content are detectable without re-reading the body.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Classify a memory into a sensitivity level when the caller did not
/// supply one explicitly. Content the scan flagged as PII-bearing is
/// classified `L3`; everything else defaults to `L2`. Callers always win
/// when they specify a level explicitly - this is only the fallback.
#[must_use]
pub fn classify(scan: &ContentScan) -> MemoryLevel {
    if scan.pii_detected {
        MemoryLevel::L3
    } else {
        MemoryLevel::L2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("world"));
    }

    #[test]
    fn test_classify_pii_as_l3() {
        let scan = ContentScan {
            pii_detected: true,
            injection_detected: false,
            notes: Vec::new(),
        };
        assert_eq!(classify(&scan), MemoryLevel::L3);
    }

    #[test]
    fn test_classify_clean_as_l2() {
        let scan = ContentScan::default();
        assert_eq!(classify(&scan), MemoryLevel::L2);
    }
}
