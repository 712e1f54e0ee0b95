//! Consecutive duplicate suppression.
//!
//! One slot holds the most recent reading. Equality is deep structural
//! equality over the decoded JSON; key order never matters.

use contracts::Reading;
use tracing::debug;

/// Remembers the previous reading of a single stream
#[derive(Debug, Default)]
pub struct Deduplicator {
    previous: Reading,
    suppressed: u64,
}

impl Deduplicator {
    /// Start with an empty previous reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `reading` equals the previous one.
    ///
    /// The slot is overwritten with `reading` on every call, duplicate or not.
    pub fn check(&mut self, reading: &Reading) -> bool {
        let duplicate = *reading == self.previous;
        if duplicate {
            self.suppressed += 1;
            debug!(suppressed = self.suppressed, "Duplicate reading suppressed");
        }
        self.previous.clone_from(reading);
        duplicate
    }

    /// Forget the previous reading
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    pub fn previous(&self) -> &Reading {
        &self.previous
    }

    /// Total duplicates suppressed since creation
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> Reading {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_repeat_is_duplicate() {
        let mut dedup = Deduplicator::new();
        let r = reading(json!({"model": "X", "id": 1, "t": 20.5}));
        assert!(!dedup.check(&r));
        assert!(dedup.check(&r));
        assert!(dedup.check(&r));
        assert_eq!(dedup.suppressed(), 2);
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let mut dedup = Deduplicator::new();
        let a: Reading = serde_json::from_str(r#"{"a": 1, "b": {"c": [1, 2]}}"#).unwrap();
        let b: Reading = serde_json::from_str(r#"{"b": {"c": [1, 2]}, "a": 1}"#).unwrap();
        assert!(!dedup.check(&a));
        assert!(dedup.check(&b));
    }

    #[test]
    fn test_single_difference_is_not_duplicate() {
        let mut dedup = Deduplicator::new();
        assert!(!dedup.check(&reading(json!({"id": 1, "t": 20}))));
        assert!(!dedup.check(&reading(json!({"id": 1, "t": 21}))));
        assert!(!dedup.check(&reading(json!({"id": 1, "t": "21"}))));
    }

    #[test]
    fn test_interleaved_readings_are_not_suppressed() {
        let mut dedup = Deduplicator::new();
        let a = reading(json!({"id": 1}));
        let b = reading(json!({"id": 2}));
        assert!(!dedup.check(&a));
        assert!(!dedup.check(&b));
        assert!(!dedup.check(&a));
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut dedup = Deduplicator::new();
        let a = reading(json!({"id": 1}));
        dedup.check(&a);
        dedup.reset();
        assert!(dedup.previous().is_empty());
        assert!(!dedup.check(&a));
    }
}
