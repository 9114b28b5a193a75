//! Sorted comparison index: the general fallback encoding.
//!
//! Keeps one entry per row, ordered by value, together with the permutation
//! back to row offsets and its inverse. Membership and range queries are
//! binary searches over the sorted values; reverse lookup is a single inverse
//! permutation step.

use std::cmp::Ordering;

use strata_bytes::Bytes;
use strata_common::{Result, verify_arg, verify_data};
use strata_rowset::RowSet;

use crate::{
    BlobSet, BlobSource, IndexKind, ScalarIndex,
    codec::Reader,
    query::{ValueRange, partition_point, range_window},
    scalar_value::ScalarValue,
};

/// Sort-based index over a scalar column.
pub struct SortedIndex<T: ScalarValue> {
    /// Column values in ascending order (duplicates retained).
    values: Vec<T>,
    /// `rows[i]` is the row offset of `values[i]`.
    rows: Vec<u32>,
    /// `positions[row]` is the position of `row`'s value within `values`.
    positions: Vec<u32>,
}

impl<T: ScalarValue> SortedIndex<T> {
    pub(crate) const VALUES_BLOB: &'static str = "sorted.values";
    pub(crate) const ROWS_BLOB: &'static str = "sorted.rows";

    /// Builds the index from raw column values.
    pub fn build(column: &[T]) -> Result<SortedIndex<T>> {
        verify_arg!(column, column.len() <= u32::MAX as usize);
        let mut rows: Vec<u32> = (0..column.len() as u32).collect();
        rows.sort_by(|&a, &b| {
            column[a as usize]
                .total_cmp(&column[b as usize])
                .then(a.cmp(&b))
        });
        let values = rows.iter().map(|&row| column[row as usize].clone()).collect();
        let positions = Self::invert_permutation(&rows);
        Ok(SortedIndex {
            values,
            rows,
            positions,
        })
    }

    /// Loads the index from its persisted blobs.
    pub fn load(source: &dyn BlobSource) -> Result<SortedIndex<T>> {
        let values_blob = source.read_blob(Self::VALUES_BLOB)?;
        let mut reader = Reader::new(&values_blob, Self::VALUES_BLOB);
        let row_count = reader.u64()? as usize;
        let mut values = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            values.push(reader.value::<T>()?);
        }
        reader.expect_end()?;
        verify_data!(
            sorted.values,
            values
                .windows(2)
                .all(|pair| pair[0].total_cmp(&pair[1]) != Ordering::Greater)
        );

        let rows_blob = source.read_blob(Self::ROWS_BLOB)?;
        verify_data!(sorted.rows, rows_blob.len() == row_count * 4);
        let rows: Vec<u32> = rows_blob
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("4 bytes")))
            .collect();
        verify_data!(sorted.rows, rows.iter().all(|&row| (row as usize) < row_count));
        let positions = Self::try_invert_permutation(&rows)?;
        Ok(SortedIndex {
            values,
            rows,
            positions,
        })
    }

    fn invert_permutation(rows: &[u32]) -> Vec<u32> {
        let mut positions = vec![0u32; rows.len()];
        for (pos, &row) in rows.iter().enumerate() {
            positions[row as usize] = pos as u32;
        }
        positions
    }

    fn try_invert_permutation(rows: &[u32]) -> Result<Vec<u32>> {
        let mut positions = vec![u32::MAX; rows.len()];
        for (pos, &row) in rows.iter().enumerate() {
            verify_data!(sorted.rows, positions[row as usize] == u32::MAX);
            positions[row as usize] = pos as u32;
        }
        Ok(positions)
    }

    fn equal_window(&self, value: &T) -> std::ops::Range<usize> {
        let lo = partition_point(self.values.len(), |i| {
            self.values[i].total_cmp(value) == Ordering::Less
        });
        let hi = partition_point(self.values.len(), |i| {
            self.values[i].total_cmp(value) != Ordering::Greater
        });
        lo..hi
    }
}

impl<T: ScalarValue> ScalarIndex<T> for SortedIndex<T> {
    fn kind(&self) -> IndexKind {
        IndexKind::Sorted
    }

    fn serialize(&self, blobs: &mut BlobSet) -> Result<()> {
        let mut values = Vec::new();
        values.extend_from_slice(&(self.values.len() as u64).to_le_bytes());
        for value in &self.values {
            value.encode_into(&mut values);
        }
        blobs.insert(Self::VALUES_BLOB, Bytes::from(values))?;

        let mut rows = Vec::with_capacity(self.rows.len() * 4);
        for &row in &self.rows {
            rows.extend_from_slice(&row.to_le_bytes());
        }
        blobs.insert(Self::ROWS_BLOB, Bytes::from(rows))?;
        Ok(())
    }

    fn is_in(&self, values: &[T]) -> Result<RowSet> {
        let mut result = RowSet::empty(self.values.len());
        for value in values {
            for pos in self.equal_window(value) {
                result.set(self.rows[pos] as usize);
            }
        }
        Ok(result)
    }

    fn not_in(&self, values: &[T]) -> Result<RowSet> {
        let mut result = self.is_in(values)?;
        result.invert();
        Ok(result)
    }

    fn range(&self, range: &ValueRange<T>) -> Result<RowSet> {
        let (lo, hi) = range_window(self.values.len(), |i| &self.values[i], range);
        let mut result = RowSet::empty(self.values.len());
        for pos in lo..hi {
            result.set(self.rows[pos] as usize);
        }
        Ok(result)
    }

    fn lookup(&self, offset: u64) -> Result<T> {
        verify_arg!(offset, offset < self.positions.len() as u64);
        Ok(self.values[self.positions[offset as usize] as usize].clone())
    }

    fn count(&self) -> u64 {
        self.values.len() as u64
    }

    fn size_in_bytes(&self) -> u64 {
        let values: usize = self.values.iter().map(|value| value.encoded_len()).sum();
        (8 + values + self.rows.len() * 4) as u64
    }

    fn has_raw_data(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::SortedIndex;
    use crate::{BlobSet, ScalarIndex, ValueRange};

    fn sample() -> SortedIndex<i64> {
        SortedIndex::build(&[50, 20, 40, 20, 10]).unwrap()
    }

    #[test]
    fn test_membership() {
        let index = sample();
        assert_eq!(index.count(), 5);

        let rows = index.is_in(&[20]).unwrap();
        assert_eq!(rows.positions().collect::<Vec<_>>(), vec![1, 3]);

        let rows = index.is_in(&[10, 50, 77]).unwrap();
        assert_eq!(rows.positions().collect::<Vec<_>>(), vec![0, 4]);

        let rows = index.not_in(&[20]).unwrap();
        assert_eq!(rows.positions().collect::<Vec<_>>(), vec![0, 2, 4]);
    }

    #[test]
    fn test_range() {
        let index = sample();
        let rows = index.range(&ValueRange::between(20, true, 40, true)).unwrap();
        assert_eq!(rows.positions().collect::<Vec<_>>(), vec![1, 2, 3]);

        let rows = index.range(&ValueRange::greater_than(40)).unwrap();
        assert_eq!(rows.positions().collect::<Vec<_>>(), vec![0]);

        let rows = index.range(&ValueRange::unbounded()).unwrap();
        assert_eq!(rows.count_ones(), 5);
    }

    #[test]
    fn test_lookup_uses_inverse_permutation() {
        let column = [50i64, 20, 40, 20, 10];
        let index = SortedIndex::build(&column).unwrap();
        for (row, &expected) in column.iter().enumerate() {
            assert_eq!(index.lookup(row as u64).unwrap(), expected);
        }
        assert!(index.lookup(5).is_err());
    }

    #[test]
    fn test_serialize_load_round_trip() {
        let index = sample();
        let mut blobs = BlobSet::new();
        index.serialize(&mut blobs).unwrap();

        let loaded = SortedIndex::<i64>::load(&blobs).unwrap();
        assert_eq!(loaded.count(), index.count());
        for offset in 0..5 {
            assert_eq!(loaded.lookup(offset).unwrap(), index.lookup(offset).unwrap());
        }
        assert_eq!(
            loaded.range(&ValueRange::at_most(20)).unwrap(),
            index.range(&ValueRange::at_most(20)).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_unsorted_values() {
        let index = sample();
        let mut blobs = BlobSet::new();
        index.serialize(&mut blobs).unwrap();

        // Swap the first two persisted values by re-encoding out of order.
        let mut values = Vec::new();
        values.extend_from_slice(&2u64.to_le_bytes());
        values.extend_from_slice(&7i64.to_le_bytes());
        values.extend_from_slice(&3i64.to_le_bytes());
        let mut rows = Vec::new();
        rows.extend_from_slice(&0u32.to_le_bytes());
        rows.extend_from_slice(&1u32.to_le_bytes());

        let mut blobs = BlobSet::new();
        blobs
            .insert(
                SortedIndex::<i64>::VALUES_BLOB,
                strata_bytes::Bytes::from(values),
            )
            .unwrap();
        blobs
            .insert(SortedIndex::<i64>::ROWS_BLOB, strata_bytes::Bytes::from(rows))
            .unwrap();
        assert!(SortedIndex::<i64>::load(&blobs).is_err());
    }

    #[test]
    fn test_load_rejects_duplicate_row_offsets() {
        let mut values = Vec::new();
        values.extend_from_slice(&2u64.to_le_bytes());
        values.extend_from_slice(&3i64.to_le_bytes());
        values.extend_from_slice(&7i64.to_le_bytes());
        let mut rows = Vec::new();
        rows.extend_from_slice(&1u32.to_le_bytes());
        rows.extend_from_slice(&1u32.to_le_bytes());

        let mut blobs = BlobSet::new();
        blobs
            .insert(
                SortedIndex::<i64>::VALUES_BLOB,
                strata_bytes::Bytes::from(values),
            )
            .unwrap();
        blobs
            .insert(SortedIndex::<i64>::ROWS_BLOB, strata_bytes::Bytes::from(rows))
            .unwrap();
        assert!(SortedIndex::<i64>::load(&blobs).is_err());
    }

    #[test]
    fn test_empty_column() {
        let index = SortedIndex::<i64>::build(&[]).unwrap();
        assert_eq!(index.count(), 0);
        assert_eq!(index.is_in(&[1]).unwrap().len(), 0);
        assert_eq!(index.range(&ValueRange::unbounded()).unwrap().len(), 0);

        let mut blobs = BlobSet::new();
        index.serialize(&mut blobs).unwrap();
        let loaded = SortedIndex::<i64>::load(&blobs).unwrap();
        assert_eq!(loaded.count(), 0);
    }
}
