//! Trigger-word detection for inbound messages (spec.md §4.H): a batch
//! is eligible for an agent turn only if at least one message in it
//! mentions the configured token as a case-insensitive whole word.
//!
//! `\bTOKEN\b` is not enough here: `\b` requires a transition between a
//! word and non-word character, and tokens like `@Andy` start with a
//! non-word character, so `\b@Andy\b` never matches `"hey @Andy"` (no
//! boundary exists between the space and the `@`). We anchor on
//! start/end-of-string or a non-word character instead.

use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// A compiled, case-insensitive whole-word matcher for one trigger
/// token.
pub struct Trigger {
    pattern: Regex,
}

impl Trigger {
    /// Compile a trigger matcher for `token` (e.g. `"@Andy"`).
    pub fn new(token: &str) -> RouterResult<Self> {
        let escaped = regex::escape(token);
        let pattern = format!(r"(?i)(?:^|[^\w]){escaped}(?:[^\w]|$)");
        let pattern = Regex::new(&pattern)
            .map_err(|err| RouterError::InvalidTrigger(err.to_string()))?;
        Ok(Self { pattern })
    }

    /// Whether `text` mentions the trigger token as a whole word.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Whether any of `texts` mentions the trigger token.
    #[must_use]
    pub fn matches_any<'a, I: IntoIterator<Item = &'a str>>(&self, texts: I) -> bool {
        texts.into_iter().any(|text| self.matches(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_plain_mention() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(trigger.matches("hey @Andy can you help"));
    }

    #[test]
    fn test_matches_at_start_of_string() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(trigger.matches("@Andy hi"));
    }

    #[test]
    fn test_matches_at_end_of_string() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(trigger.matches("ping @Andy"));
    }

    #[test]
    fn test_is_case_insensitive() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(trigger.matches("hey @ANDY"));
        assert!(trigger.matches("hey @andy"));
    }

    #[test]
    fn test_does_not_match_substring_of_longer_word() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(!trigger.matches("@Andyson is here"));
    }

    #[test]
    fn test_does_not_match_unrelated_text() {
        let trigger = Trigger::new("@Andy").unwrap();
        assert!(!trigger.matches("no mention here"));
    }

    #[test]
    fn test_matches_any_across_batch() {
        let trigger = Trigger::new("@Andy").unwrap();
        let batch = vec!["unrelated", "still nothing", "@Andy wake up"];
        assert!(trigger.matches_any(batch));
    }

    #[test]
    fn test_word_token_without_symbol() {
        let trigger = Trigger::new("andy").unwrap();
        assert!(trigger.matches("Andy, are you there?"));
        assert!(!trigger.matches("handy tool"));
    }
}
