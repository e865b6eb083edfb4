//! Heuristic PII and prompt-injection scanning (spec.md §4.I, `mem_store`).
//!
//! Both heuristics are deliberately coarse: the scan records what it found
//! for audit purposes but never blocks the store. False positives cost
//! nothing; false negatives are mitigated by L3's access restriction
//! rather than by tightening the regexes.

use std::sync::LazyLock;

use nanoclaw_core::ContentScan;
use regex::Regex;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[A-Za-z]{2,}").unwrap());
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap());
static SSN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CREDIT_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap());

static INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "disregard the above",
    "disregard prior instructions",
    "you are now",
    "new instructions:",
    "system prompt:",
];

/// Scan `content` for PII-shaped substrings and prompt-injection
/// indicators, recording what matched without altering `content`.
#[must_use]
pub fn scan(content: &str) -> ContentScan {
    let mut notes = Vec::new();

    let mut pii_detected = false;
    if EMAIL.is_match(content) {
        pii_detected = true;
        notes.push("email-like substring".to_string());
    }
    if PHONE.is_match(content) {
        pii_detected = true;
        notes.push("phone-number-like substring".to_string());
    }
    if SSN.is_match(content) {
        pii_detected = true;
        notes.push("SSN-like substring".to_string());
    }
    if CREDIT_CARD.is_match(content) {
        pii_detected = true;
        notes.push("credit-card-like substring".to_string());
    }

    let lower = content.to_lowercase();
    let mut injection_detected = false;
    for phrase in INJECTION_PHRASES {
        if lower.contains(phrase) {
            injection_detected = true;
            notes.push(format!("injection phrase: \"{phrase}\""));
        }
    }

    ContentScan {
        pii_detected,
        injection_detected,
        notes,
    }
}
