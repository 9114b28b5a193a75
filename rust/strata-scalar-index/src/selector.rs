//! Index selection policy.
//!
//! Given the statistics of the column to be indexed, the selector picks
//! exactly one physical encoding. The decision is a pure function of the
//! statistics, the configured cardinality limit and the element type; there is
//! no cross-instance state, so the same column content always yields the same
//! decision regardless of row order or batching.

use crate::{IndexKind, scalar_value::ScalarValue, stats::ValueStats};

/// Default number of distinct values up to which the bitmap encoding is
/// preferred over a sorted array.
pub const DEFAULT_CARDINALITY_LIMIT: usize = 100;

/// Chooses the physical index encoding for a column.
#[derive(Debug, Clone)]
pub struct IndexSelector {
    cardinality_limit: usize,
}

impl IndexSelector {
    /// Creates a selector with the given bitmap cardinality limit.
    pub fn new(cardinality_limit: usize) -> IndexSelector {
        IndexSelector { cardinality_limit }
    }

    /// Returns the configured cardinality limit.
    pub fn cardinality_limit(&self) -> usize {
        self.cardinality_limit
    }

    /// Picks the encoding for a column of `T` with the given statistics.
    ///
    /// - An empty column falls back to the sorted encoding, which builds and
    ///   queries cleanly over zero rows.
    /// - At most `cardinality_limit` distinct values: bitmap, since one small
    ///   row bitmap per value is cheaper than an ordered array of all rows.
    /// - More distinct values than the limit: trie for string types (shared
    ///   prefixes amortize storage across many distinct keys), sorted for
    ///   everything else.
    pub fn select<T: ScalarValue>(&self, stats: &ValueStats) -> IndexKind {
        if stats.row_count == 0 || stats.distinct_count == 0 {
            return IndexKind::Sorted;
        }
        if !stats.distinct_saturated && stats.distinct_count as usize <= self.cardinality_limit {
            return IndexKind::Bitmap;
        }
        if T::SUPPORTS_TRIE {
            IndexKind::Trie
        } else {
            IndexKind::Sorted
        }
    }
}

impl Default for IndexSelector {
    fn default() -> IndexSelector {
        IndexSelector::new(DEFAULT_CARDINALITY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::IndexSelector;
    use crate::{IndexKind, stats::ValueStatsCollector};

    fn select_for<T: crate::ScalarValue>(values: &[T], limit: usize) -> IndexKind {
        let mut collector = ValueStatsCollector::<T>::new(limit);
        collector.process_values(values);
        IndexSelector::new(limit).select::<T>(&collector.finish())
    }

    #[test]
    fn test_empty_column_selects_sorted() {
        assert_eq!(select_for::<i64>(&[], 8), IndexKind::Sorted);
        assert_eq!(select_for::<String>(&[], 8), IndexKind::Sorted);
    }

    #[test]
    fn test_threshold_boundary() {
        let at_limit: Vec<i64> = (0..8).collect();
        assert_eq!(select_for(&at_limit, 8), IndexKind::Bitmap);

        let over_limit: Vec<i64> = (0..9).collect();
        assert_eq!(select_for(&over_limit, 8), IndexKind::Sorted);

        let strings_at_limit: Vec<String> = (0..8).map(|i| format!("s{i}")).collect();
        assert_eq!(select_for(&strings_at_limit, 8), IndexKind::Bitmap);

        let strings_over_limit: Vec<String> = (0..9).map(|i| format!("s{i}")).collect();
        assert_eq!(select_for(&strings_over_limit, 8), IndexKind::Trie);
    }

    #[test]
    fn test_decision_is_order_independent() {
        let mut values: Vec<i64> = (0..200).map(|i| i % 40).collect();
        let forward = select_for(&values, 16);
        values.reverse();
        assert_eq!(select_for(&values, 16), forward);

        fastrand::seed(81231145);
        fastrand::shuffle(&mut values);
        assert_eq!(select_for(&values, 16), forward);
    }
}
