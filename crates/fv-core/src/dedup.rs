//! Timestamp deduplication.
//!
//! Upstream candle responses occasionally repeat a bar (same timestamp,
//! sometimes with a revised volume). [`TimestampDedup`] keeps the *first*
//! occurrence of each timestamp and drops every later one.

use ahash::AHashSet;

/// First-seen filter keyed by a Unix timestamp.
///
/// # Thread safety
///
/// Not thread-safe. Each parser owns its own instance.
pub struct TimestampDedup {
    seen: AHashSet<i64>,
}

impl TimestampDedup {
    pub fn new() -> Self {
        Self {
            seen: AHashSet::new(),
        }
    }

    /// Pre-size for `n` expected timestamps.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            seen: AHashSet::with_capacity(n),
        }
    }

    /// Returns `true` if `ts` has not been seen before, recording it.
    #[inline]
    pub fn check_and_insert(&mut self, ts: i64) -> bool {
        self.seen.insert(ts)
    }

    /// Number of distinct timestamps recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

impl Default for TimestampDedup {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the first item per key, then sort the survivors ascending by key.
///
/// The sort is stable, so ties (which cannot survive dedup anyway) keep
/// their input order.
pub fn dedup_sorted_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    let mut dedup = TimestampDedup::with_capacity(items.len());
    let mut out: Vec<T> = items
        .into_iter()
        .filter(|item| dedup.check_and_insert(key(item)))
        .collect();
    out.sort_by_key(|item| key(item));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let mut dedup = TimestampDedup::new();
        assert!(dedup.check_and_insert(100));
        assert!(!dedup.check_and_insert(100));
        assert!(dedup.check_and_insert(99));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn clear_resets() {
        let mut dedup = TimestampDedup::new();
        dedup.check_and_insert(1);
        dedup.clear();
        assert!(dedup.is_empty());
        assert!(dedup.check_and_insert(1));
    }

    #[test]
    fn dedup_then_sort() {
        let items = vec![(300, 'a'), (100, 'b'), (300, 'c'), (200, 'd')];
        let out = dedup_sorted_by_key(items, |(ts, _)| *ts);
        assert_eq!(out, vec![(100, 'b'), (200, 'd'), (300, 'a')]);
    }
}
