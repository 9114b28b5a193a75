//! Batched column input for the build path.

use std::collections::VecDeque;

use strata_common::Result;

use crate::scalar_value::ScalarValue;

/// A pull-based source of column value batches.
///
/// Abstracts where raw column data comes from when it is not already in
/// memory, e.g. a remote columnar store read in chunks. Batches may be of any
/// size; the index selection decision depends only on the concatenated
/// values, never on the chunking.
pub trait ColumnSource<T: ScalarValue> {
    /// Returns the next batch of values, or `None` when the column is
    /// exhausted.
    fn next_batch(&mut self) -> Result<Option<Vec<T>>>;
}

/// A `ColumnSource` over pre-materialized batches.
pub struct SliceBatchSource<T> {
    batches: VecDeque<Vec<T>>,
}

impl<T> SliceBatchSource<T> {
    pub fn new(batches: Vec<Vec<T>>) -> SliceBatchSource<T> {
        SliceBatchSource {
            batches: batches.into(),
        }
    }
}

impl<T: ScalarValue> ColumnSource<T> for SliceBatchSource<T> {
    fn next_batch(&mut self) -> Result<Option<Vec<T>>> {
        Ok(self.batches.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnSource, SliceBatchSource};

    #[test]
    fn test_drains_batches_in_order() {
        let mut source = SliceBatchSource::new(vec![vec![1i64, 2], vec![], vec![3]]);
        assert_eq!(source.next_batch().unwrap(), Some(vec![1, 2]));
        assert_eq!(source.next_batch().unwrap(), Some(vec![]));
        assert_eq!(source.next_batch().unwrap(), Some(vec![3]));
        assert_eq!(source.next_batch().unwrap(), None);
    }
}
