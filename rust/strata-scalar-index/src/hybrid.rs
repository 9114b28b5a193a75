//! The hybrid scalar index: adaptive selection, one owned variant, and the
//! build → serialize → persist → load → query state machine.

use std::sync::Arc;

use strata_bytes::Bytes;
use strata_common::{Result, error::Error};
use strata_objectstore::{ObjectStore, url::ObjectUrl};
use strata_rowset::RowSet;

use crate::{
    BlobSet, BlobSource, DESCRIPTOR_BLOB, IndexDescriptor, IndexKind, ScalarIndex,
    bitmap::BitmapIndex,
    query::ValueRange,
    scalar_value::ScalarValue,
    selector::IndexSelector,
    sorted::SortedIndex,
    source::ColumnSource,
    stats::{ValueStats, ValueStatsCollector},
    store::{IndexManifest, StoredBlobs},
};

/// A scalar index that picks its physical encoding at build time.
///
/// An instance starts empty and becomes ready exactly once, either by
/// [`build`](Self::build) (the selection policy runs over the column and the
/// chosen variant is constructed from the raw values) or by
/// [`load`](Self::load) (the persisted descriptor names the variant to
/// reconstruct). Once ready the selected variant never changes, and every
/// query is forwarded to it unchanged.
///
/// All state transitions are guarded: building or loading a ready instance
/// fails with an already-ready error, and querying or serializing a non-ready
/// instance fails with a not-ready error, never silently.
///
/// # Thread Safety
///
/// Build and load take `&mut self`, so at most one is in flight per instance.
/// Once ready, all query methods take `&self` and are safe to call
/// concurrently; the variant contract requires `Send + Sync`.
pub struct HybridScalarIndex<T: ScalarValue> {
    selector: IndexSelector,
    inner: Option<Box<dyn ScalarIndex<T>>>,
    uploaded: Option<IndexManifest>,
}

impl<T: ScalarValue> HybridScalarIndex<T> {
    /// Creates an empty index with the default bitmap cardinality limit.
    pub fn new() -> HybridScalarIndex<T> {
        Self::with_selector(IndexSelector::default())
    }

    /// Creates an empty index that prefers the bitmap encoding up to the given
    /// number of distinct values.
    pub fn with_cardinality_limit(cardinality_limit: usize) -> HybridScalarIndex<T> {
        Self::with_selector(IndexSelector::new(cardinality_limit))
    }

    fn with_selector(selector: IndexSelector) -> HybridScalarIndex<T> {
        HybridScalarIndex {
            selector,
            inner: None,
            uploaded: None,
        }
    }

    /// Returns the configured bitmap cardinality limit.
    pub fn cardinality_limit(&self) -> usize {
        self.selector.cardinality_limit()
    }

    /// Returns `true` once a build or load completed successfully.
    pub fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns the encoding selected by the completed build or load, if any.
    pub fn selected_kind(&self) -> Option<IndexKind> {
        self.inner.as_ref().map(|inner| inner.kind())
    }

    /// Builds the index over an in-memory column.
    ///
    /// Runs the selection policy, constructs the chosen variant and populates
    /// it from `values`. On failure the instance stays not-ready; nothing is
    /// partially committed.
    ///
    /// # Errors
    ///
    /// - `AlreadyReady` if the instance already completed a build or load.
    /// - `BuildFailed` if the selected variant cannot be built from `values`.
    pub fn build(&mut self, values: &[T]) -> Result<()> {
        self.ensure_not_ready("build")?;
        let mut collector = ValueStatsCollector::new(self.selector.cardinality_limit());
        collector.process_values(values);
        self.build_selected(values, collector.finish())
    }

    /// Builds the index from a batched column source.
    ///
    /// Statistics are folded batch by batch, so the selection decision is
    /// identical to the in-memory path for the same logical data regardless of
    /// how the source chunks it.
    pub fn build_from_source(&mut self, source: &mut dyn ColumnSource<T>) -> Result<()> {
        self.ensure_not_ready("build")?;
        let mut collector = ValueStatsCollector::new(self.selector.cardinality_limit());
        let mut values = Vec::new();
        while let Some(batch) = source.next_batch()? {
            collector.process_values(&batch);
            values.extend(batch);
        }
        self.build_selected(&values, collector.finish())
    }

    fn build_selected(&mut self, values: &[T], stats: ValueStats) -> Result<()> {
        let kind = self.selector.select::<T>(&stats);
        let inner = Self::build_variant(kind, values)
            .map_err(|e| Error::build_failed(kind.to_string(), e.to_string()))?;
        log::debug!(
            "built {kind} scalar index: {} rows, {} distinct values{}",
            stats.row_count,
            stats.distinct_count,
            if stats.distinct_saturated { "+" } else { "" }
        );
        self.inner = Some(inner);
        Ok(())
    }

    fn build_variant(kind: IndexKind, values: &[T]) -> Result<Box<dyn ScalarIndex<T>>> {
        match kind {
            IndexKind::Bitmap => Ok(Box::new(BitmapIndex::build(values)?)),
            IndexKind::Sorted => Ok(Box::new(SortedIndex::build(values)?)),
            IndexKind::Trie => T::build_trie(values),
        }
    }

    /// Serializes the index into named blobs.
    ///
    /// The returned set contains the descriptor blob under the reserved
    /// [`DESCRIPTOR_BLOB`] name plus every blob the variant emits; the caller
    /// owns the result.
    ///
    /// # Errors
    ///
    /// `NotReady` if no build or load completed yet.
    pub fn serialize(&self) -> Result<BlobSet> {
        let inner = self.ready_inner("serialize")?;
        let mut blobs = BlobSet::new();
        let descriptor = IndexDescriptor::new(inner.kind(), T::TYPE);
        blobs.insert(DESCRIPTOR_BLOB, Bytes::copy_from_slice(&descriptor.encode()))?;
        inner.serialize(&mut blobs)?;
        Ok(blobs)
    }

    /// Serializes the index and persists every blob under `container` in the
    /// given store, together with a manifest object enumerating them.
    ///
    /// Re-uploading the same built state to the same container returns the
    /// cached manifest of the previous successful upload without rewriting any
    /// bytes.
    pub fn upload(
        &mut self,
        store: &dyn ObjectStore,
        container: &ObjectUrl,
    ) -> Result<IndexManifest> {
        self.ready_inner("upload")?;
        if let Some(manifest) = &self.uploaded {
            if manifest.container() == container {
                return Ok(manifest.clone());
            }
        }
        let blobs = self.serialize()?;
        let manifest = crate::store::upload_blobs(store, container, &blobs)?;
        log::debug!(
            "uploaded scalar index: {} blobs under {}",
            manifest.entries().len(),
            container.as_str()
        );
        self.uploaded = Some(manifest.clone());
        Ok(manifest)
    }

    /// Loads the index from named blobs.
    ///
    /// The reserved descriptor blob is read and decoded first; it alone
    /// determines which variant implementation is constructed to load the
    /// remaining blobs. On failure the instance stays not-ready.
    ///
    /// # Errors
    ///
    /// - `AlreadyReady` if the instance already completed a build or load.
    /// - `CorruptIndex` if the descriptor is missing, malformed or carries an
    ///   unrecognized tag, or if the variant rejects its blobs.
    /// - `TypeMismatch` if the persisted element type differs from `T`.
    pub fn load(&mut self, source: &dyn BlobSource) -> Result<()> {
        self.ensure_not_ready("load")?;
        let descriptor_blob = source.read_blob(DESCRIPTOR_BLOB)?;
        let descriptor = IndexDescriptor::decode(&descriptor_blob)?;
        if descriptor.value_type != T::TYPE {
            return Err(Error::type_mismatch(
                DESCRIPTOR_BLOB,
                T::TYPE.to_string(),
                descriptor.value_type.to_string(),
            ));
        }
        let inner = Self::load_variant(descriptor.kind, source)?;
        log::debug!(
            "loaded {} scalar index: {} rows",
            descriptor.kind,
            inner.count()
        );
        self.inner = Some(inner);
        Ok(())
    }

    /// Loads the index from a persisted manifest, fetching blobs from the
    /// store on demand.
    ///
    /// Only the descriptor blob is fetched eagerly; variant-body blobs are
    /// pulled when the variant's own load asks for them.
    pub fn load_from_store(
        &mut self,
        store: Arc<dyn ObjectStore>,
        manifest: &IndexManifest,
    ) -> Result<()> {
        let source = StoredBlobs::new(store, manifest.clone());
        self.load(&source)
    }

    fn load_variant(kind: IndexKind, source: &dyn BlobSource) -> Result<Box<dyn ScalarIndex<T>>> {
        match kind {
            IndexKind::Bitmap => Ok(Box::new(BitmapIndex::load(source)?)),
            IndexKind::Sorted => Ok(Box::new(SortedIndex::load(source)?)),
            IndexKind::Trie => T::load_trie(source),
        }
    }

    /// Returns the set of rows whose value equals any of `values`.
    pub fn is_in(&self, values: &[T]) -> Result<RowSet> {
        self.ready_inner("is_in")?.is_in(values)
    }

    /// Returns the set of rows whose value equals none of `values`.
    pub fn not_in(&self, values: &[T]) -> Result<RowSet> {
        self.ready_inner("not_in")?.not_in(values)
    }

    /// Returns the set of rows whose value falls within `range`.
    pub fn range(&self, range: &ValueRange<T>) -> Result<RowSet> {
        self.ready_inner("range")?.range(range)
    }

    /// Returns the value stored at the given row offset.
    pub fn lookup(&self, offset: u64) -> Result<T> {
        self.ready_inner("lookup")?.lookup(offset)
    }

    /// Returns the number of indexed rows.
    pub fn count(&self) -> Result<u64> {
        Ok(self.ready_inner("count")?.count())
    }

    /// Returns the serialized footprint of the index in bytes.
    pub fn size_in_bytes(&self) -> Result<u64> {
        Ok(self.ready_inner("size_in_bytes")?.size_in_bytes())
    }

    /// Returns `true` if the selected variant can recover original values.
    pub fn has_raw_data(&self) -> Result<bool> {
        Ok(self.ready_inner("has_raw_data")?.has_raw_data())
    }

    fn ready_inner(&self, operation: &str) -> Result<&dyn ScalarIndex<T>> {
        self.inner
            .as_deref()
            .ok_or_else(|| Error::not_ready(operation))
    }

    fn ensure_not_ready(&self, operation: &str) -> Result<()> {
        if self.inner.is_some() {
            Err(Error::already_ready(operation))
        } else {
            Ok(())
        }
    }
}

impl<T: ScalarValue> Default for HybridScalarIndex<T> {
    fn default() -> HybridScalarIndex<T> {
        HybridScalarIndex::new()
    }
}

#[cfg(test)]
mod tests {
    use super::HybridScalarIndex;
    use crate::{IndexKind, SliceBatchSource};
    use strata_common::error::ErrorKind;

    #[test]
    fn test_selection_is_recorded() {
        let mut index = HybridScalarIndex::<i64>::with_cardinality_limit(3);
        assert_eq!(index.selected_kind(), None);
        index.build(&[1, 1, 2, 2, 3, 3]).unwrap();
        assert_eq!(index.selected_kind(), Some(IndexKind::Bitmap));
        assert_eq!(index.count().unwrap(), 6);
    }

    #[test]
    fn test_state_machine_guards() {
        let mut index = HybridScalarIndex::<i64>::new();
        assert!(matches!(
            index.is_in(&[1]).unwrap_err().kind(),
            ErrorKind::NotReady { .. }
        ));
        assert!(matches!(
            index.serialize().unwrap_err().kind(),
            ErrorKind::NotReady { .. }
        ));

        index.build(&[1, 2, 3]).unwrap();
        assert!(matches!(
            index.build(&[4, 5]).unwrap_err().kind(),
            ErrorKind::AlreadyReady { .. }
        ));

        let blobs = index.serialize().unwrap();
        assert!(matches!(
            index.load(&blobs).unwrap_err().kind(),
            ErrorKind::AlreadyReady { .. }
        ));
    }

    #[test]
    fn test_batched_build_matches_in_memory_build() {
        let values: Vec<i64> = (0..300).map(|i| i % 70).collect();

        let mut whole = HybridScalarIndex::<i64>::with_cardinality_limit(16);
        whole.build(&values).unwrap();

        let batches: Vec<Vec<i64>> = values.chunks(37).map(|c| c.to_vec()).collect();
        let mut batched = HybridScalarIndex::<i64>::with_cardinality_limit(16);
        batched
            .build_from_source(&mut SliceBatchSource::new(batches))
            .unwrap();

        assert_eq!(whole.selected_kind(), batched.selected_kind());
        assert_eq!(whole.count().unwrap(), batched.count().unwrap());
        assert_eq!(
            whole.is_in(&[13, 42]).unwrap(),
            batched.is_in(&[13, 42]).unwrap()
        );
    }

    #[test]
    fn test_failed_build_leaves_instance_not_ready() {
        // A batch source that fails mid-stream.
        struct FailingSource(u32);
        impl crate::ColumnSource<i64> for FailingSource {
            fn next_batch(&mut self) -> strata_common::Result<Option<Vec<i64>>> {
                self.0 += 1;
                if self.0 > 2 {
                    Err(strata_common::error::Error::io(
                        "column source",
                        std::io::Error::other("connection reset"),
                    ))
                } else {
                    Ok(Some(vec![1, 2, 3]))
                }
            }
        }

        let mut index = HybridScalarIndex::<i64>::new();
        assert!(index.build_from_source(&mut FailingSource(0)).is_err());
        assert!(!index.is_ready());

        // The instance is still buildable after the failure.
        index.build(&[1, 2, 3]).unwrap();
        assert!(index.is_ready());
    }
}
