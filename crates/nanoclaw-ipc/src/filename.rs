//! The `<ms>-<rand>.json` filename scheme (spec.md §4.C).
//!
//! Filenames carry a monotonic-enough millisecond timestamp plus a
//! random suffix so concurrent writers never collide, while still
//! sorting timestamp-ascending for in-order processing.

use chrono::{DateTime, Utc};

/// Build a fresh `<ms>-<rand>.json` filename for `now`.
#[must_use]
pub fn generate(now: DateTime<Utc>) -> String {
    let ms = now.timestamp_millis();
    let rand = fastrand::u32(..);
    format!("{ms}-{rand:08x}.json")
}

/// Parse the leading millisecond timestamp out of a generated filename,
/// for sorting. Returns `None` for filenames that don't match the
/// `<ms>-<rand>.json` shape (e.g. `_close`, `current_tasks.json`).
#[must_use]
pub fn timestamp_of(filename: &str) -> Option<i64> {
    let stem = filename.strip_suffix(".json")?;
    let (ms, _rand) = stem.split_once('-')?;
    ms.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_matches_expected_shape() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let name = generate(now);
        assert!(name.starts_with(&now.timestamp_millis().to_string()));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_timestamp_of_roundtrips_with_generate() {
        let now = Utc::now();
        let name = generate(now);
        assert_eq!(timestamp_of(&name), Some(now.timestamp_millis()));
    }

    #[test]
    fn test_timestamp_of_rejects_non_matching_names() {
        assert_eq!(timestamp_of("_close"), None);
        assert_eq!(timestamp_of("current_tasks.json"), None);
    }

    #[test]
    fn test_two_generated_names_sort_by_timestamp() {
        let earlier = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(5);

        let mut names = vec![generate(later), generate(earlier)];
        names.sort_by_key(|n| timestamp_of(n).unwrap());

        assert!(timestamp_of(&names[0]).unwrap() <= timestamp_of(&names[1]).unwrap());
    }
}
