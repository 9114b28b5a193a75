//! Bitmap index: one row bitmap per distinct value.
//!
//! Chosen for low-cardinality columns, where a handful of per-value bitmaps is
//! cheaper than an ordered array of all rows. The distinct values are kept in
//! total order, so range queries reduce to OR-ing a contiguous window of
//! bitmaps.

use std::cmp::Ordering;

use ahash::AHashMap;
use strata_bytes::Bytes;
use strata_common::{Result, error::Error, verify_arg, verify_data};
use strata_rowset::RowSet;

use crate::{
    BlobSet, BlobSource, IndexKind, ScalarIndex,
    codec::Reader,
    query::{ValueRange, partition_point, range_window},
    scalar_value::ScalarValue,
};

struct BitmapEntry<T> {
    value: T,
    rows: RowSet,
}

/// Per-value bitmap index over a scalar column.
pub struct BitmapIndex<T: ScalarValue> {
    /// Distinct values in ascending order, each with the bitmap of its rows.
    entries: Vec<BitmapEntry<T>>,
    row_count: u64,
}

impl<T: ScalarValue> BitmapIndex<T> {
    pub(crate) const DICT_BLOB: &'static str = "bitmap.dict";
    pub(crate) const ROWS_BLOB: &'static str = "bitmap.rows";

    /// Builds the index from raw column values.
    pub fn build(values: &[T]) -> Result<BitmapIndex<T>> {
        verify_arg!(values, values.len() <= u32::MAX as usize);
        let mut slots: AHashMap<Vec<u8>, usize> = AHashMap::new();
        let mut groups: Vec<(T, Vec<usize>)> = Vec::new();
        let mut key = Vec::new();
        for (row, value) in values.iter().enumerate() {
            key.clear();
            value.encode_into(&mut key);
            match slots.get(&key) {
                Some(&slot) => groups[slot].1.push(row),
                None => {
                    slots.insert(key.clone(), groups.len());
                    groups.push((value.clone(), vec![row]));
                }
            }
        }
        groups.sort_by(|a, b| a.0.total_cmp(&b.0));

        let entries = groups
            .into_iter()
            .map(|(value, rows)| BitmapEntry {
                value,
                rows: RowSet::from_positions(values.len(), rows),
            })
            .collect();
        Ok(BitmapIndex {
            entries,
            row_count: values.len() as u64,
        })
    }

    /// Loads the index from its persisted blobs.
    pub fn load(source: &dyn BlobSource) -> Result<BitmapIndex<T>> {
        let dict = source.read_blob(Self::DICT_BLOB)?;
        let mut reader = Reader::new(&dict, Self::DICT_BLOB);
        let row_count = reader.u64()?;
        let entry_count = reader.u32()? as usize;
        let mut dict_values = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            dict_values.push(reader.value::<T>()?);
        }
        reader.expect_end()?;
        verify_data!(
            bitmap.dict,
            dict_values
                .windows(2)
                .all(|pair| pair[0].total_cmp(&pair[1]) == Ordering::Less)
        );

        let rows = source.read_blob(Self::ROWS_BLOB)?;
        let words_per_entry = (row_count as usize).div_ceil(64);
        verify_data!(bitmap.rows, rows.len() == entry_count * words_per_entry * 8);
        let mut entries = Vec::with_capacity(entry_count);
        for (slot, value) in dict_values.into_iter().enumerate() {
            let start = slot * words_per_entry * 8;
            let words = rows[start..start + words_per_entry * 8]
                .chunks_exact(8)
                .map(|chunk| u64::from_le_bytes(chunk.try_into().expect("8 bytes")))
                .collect();
            let bitmap = RowSet::try_from_words(row_count as usize, words)
                .ok_or_else(|| Error::corrupt(Self::ROWS_BLOB, "malformed value bitmap"))?;
            entries.push(BitmapEntry {
                value,
                rows: bitmap,
            });
        }
        Ok(BitmapIndex { entries, row_count })
    }

    fn find(&self, value: &T) -> Option<usize> {
        let slot = partition_point(self.entries.len(), |i| {
            self.entries[i].value.total_cmp(value) == Ordering::Less
        });
        (slot < self.entries.len()
            && self.entries[slot].value.total_cmp(value) == Ordering::Equal)
            .then_some(slot)
    }

    fn union_of(&self, slots: std::ops::Range<usize>) -> RowSet {
        let mut result = RowSet::empty(self.row_count as usize);
        for entry in &self.entries[slots] {
            result.union_with(&entry.rows);
        }
        result
    }
}

impl<T: ScalarValue> ScalarIndex<T> for BitmapIndex<T> {
    fn kind(&self) -> IndexKind {
        IndexKind::Bitmap
    }

    fn serialize(&self, blobs: &mut BlobSet) -> Result<()> {
        let mut dict = Vec::new();
        dict.extend_from_slice(&self.row_count.to_le_bytes());
        dict.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            entry.value.encode_into(&mut dict);
        }
        blobs.insert(Self::DICT_BLOB, Bytes::from(dict))?;

        let words_per_entry = (self.row_count as usize).div_ceil(64);
        let mut rows = Vec::with_capacity(self.entries.len() * words_per_entry * 8);
        for entry in &self.entries {
            for word in entry.rows.as_words() {
                rows.extend_from_slice(&word.to_le_bytes());
            }
        }
        blobs.insert(Self::ROWS_BLOB, Bytes::from(rows))?;
        Ok(())
    }

    fn is_in(&self, values: &[T]) -> Result<RowSet> {
        let mut result = RowSet::empty(self.row_count as usize);
        for value in values {
            if let Some(slot) = self.find(value) {
                result.union_with(&self.entries[slot].rows);
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
        let (lo, hi) = range_window(self.entries.len(), |i| &self.entries[i].value, range);
        Ok(self.union_of(lo..hi))
    }

    fn lookup(&self, offset: u64) -> Result<T> {
        verify_arg!(offset, offset < self.row_count);
        self.entries
            .iter()
            .find(|entry| entry.rows.get(offset as usize))
            .map(|entry| entry.value.clone())
            .ok_or_else(|| Error::corrupt(Self::ROWS_BLOB, "row is not covered by any value"))
    }

    fn count(&self) -> u64 {
        self.row_count
    }

    fn size_in_bytes(&self) -> u64 {
        let dict: usize = self
            .entries
            .iter()
            .map(|entry| entry.value.encoded_len())
            .sum();
        let rows = self.entries.len() * (self.row_count as usize).div_ceil(64) * 8;
        (12 + dict + rows) as u64
    }

    fn has_raw_data(&self) -> bool {
        true
    }
}
