//! Column statistics driving the index selection policy.
//!
//! The collector folds value batches into a [`ValueStats`] summary. Distinct
//! values are tracked by their canonical encoding in a hash set, so the result
//! depends only on the multiset of values: permuting the rows or re-chunking
//! the batches never changes the outcome.
//!
//! The policy only ever asks whether the distinct count is within the
//! configured cardinality limit, so the set stops growing once it exceeds the
//! limit and the stats are marked saturated.

use ahash::AHashSet;
use std::marker::PhantomData;

use crate::scalar_value::ScalarValue;

/// Summary statistics of one indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueStats {
    /// Total number of rows processed.
    pub row_count: u64,

    /// Number of distinct values observed, exact unless
    /// [`distinct_saturated`](Self::distinct_saturated) is set.
    pub distinct_count: u64,

    /// Set when the distinct count exceeded the collector's cardinality limit
    /// and tracking stopped.
    pub distinct_saturated: bool,
}

/// Accumulates [`ValueStats`] over one or more batches of column values.
pub struct ValueStatsCollector<T: ScalarValue> {
    distinct: AHashSet<Vec<u8>>,
    cardinality_limit: usize,
    row_count: u64,
    key_buf: Vec<u8>,
    _marker: PhantomData<fn(T)>,
}

impl<T: ScalarValue> ValueStatsCollector<T> {
    /// Creates a collector that tracks distinct values exactly up to
    /// `cardinality_limit` and saturates beyond it.
    pub fn new(cardinality_limit: usize) -> ValueStatsCollector<T> {
        ValueStatsCollector {
            distinct: AHashSet::new(),
            cardinality_limit,
            row_count: 0,
            key_buf: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Folds a batch of values into the statistics.
    pub fn process_values(&mut self, values: &[T]) {
        self.row_count += values.len() as u64;
        for value in values {
            if self.distinct.len() > self.cardinality_limit {
                break;
            }
            self.key_buf.clear();
            value.encode_into(&mut self.key_buf);
            if !self.distinct.contains(&self.key_buf) {
                self.distinct.insert(self.key_buf.clone());
            }
        }
    }

    /// Finishes the collection and returns the summary.
    pub fn finish(self) -> ValueStats {
        ValueStats {
            row_count: self.row_count,
            distinct_count: self.distinct.len() as u64,
            distinct_saturated: self.distinct.len() > self.cardinality_limit,
        }
    }
}
