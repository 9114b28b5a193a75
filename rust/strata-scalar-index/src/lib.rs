//! Adaptive scalar indexing for columnar data.
//!
//! This crate provides [`HybridScalarIndex`], a scalar attribute index that
//! does not commit to a single physical representation. At build time it
//! inspects the column being indexed and materializes one of several
//! interchangeable encodings behind the [`ScalarIndex`] capability trait:
//!
//! - a **bitmap** index for low-cardinality columns (one row bitmap per
//!   distinct value),
//! - a **sorted** comparison index as the general fallback for ordered data,
//! - a **trie** index for high-cardinality string columns.
//!
//! The chosen encoding is recorded in a small self-describing descriptor blob
//! that is persisted ahead of the variant's own artifacts, so a reader can
//! reconstruct the matching implementation from bytes alone, with no external
//! hints.
//!
//! # Architecture
//!
//! - [`selector`] decides which encoding to materialize, as a pure function of
//!   the column statistics collected by [`stats`].
//! - [`hybrid`] owns the build → serialize → persist → load → query state
//!   machine and routes every query to the single owned variant.
//! - [`descriptor`] defines the persisted variant tag; [`blobs`] and [`store`]
//!   carry the named-blob serialization contract, in memory and against an
//!   object store respectively.
//! - [`bitmap`], [`sorted`] and [`trie`] implement the concrete encodings.

use strata_common::Result;
use strata_rowset::RowSet;

pub mod bitmap;
pub mod blobs;
mod codec;
pub mod descriptor;
pub mod hybrid;
pub mod query;
pub mod scalar_value;
pub mod selector;
pub mod sorted;
pub mod source;
pub mod stats;
pub mod store;
pub mod trie;

pub use blobs::{BlobSet, BlobSource};
pub use descriptor::{DESCRIPTOR_BLOB, IndexDescriptor, IndexKind};
pub use hybrid::HybridScalarIndex;
pub use query::ValueRange;
pub use scalar_value::{ScalarValue, ValueType};
pub use selector::{DEFAULT_CARDINALITY_LIMIT, IndexSelector};
pub use source::{ColumnSource, SliceBatchSource};
pub use stats::{ValueStats, ValueStatsCollector};
pub use store::{IndexManifest, StoredBlobs};

/// Capability contract satisfied by every concrete index encoding.
///
/// A variant is constructed either by its own `build` associated function
/// (from raw column values) or by its `load` associated function (from
/// persisted blobs); once constructed it is immutable. The hybrid index owns
/// exactly one `ScalarIndex` instance and forwards every query to it
/// unchanged, so any implementation satisfying this contract is pluggable
/// without touching the dispatch layer.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: once ready, an index is queried
/// concurrently from multiple threads without external locking, and no query
/// method takes `&mut self`.
pub trait ScalarIndex<T: ScalarValue>: Send + Sync + 'static {
    /// Returns the encoding tag of this variant, as persisted in the index
    /// descriptor.
    fn kind(&self) -> IndexKind;

    /// Appends this variant's serialized artifacts to `blobs`, each under its
    /// own name.
    ///
    /// Variant blob names must never collide with the reserved descriptor
    /// name [`DESCRIPTOR_BLOB`].
    fn serialize(&self, blobs: &mut BlobSet) -> Result<()>;

    /// Returns the set of rows whose value equals any of `values`.
    fn is_in(&self, values: &[T]) -> Result<RowSet>;

    /// Returns the set of rows whose value equals none of `values`.
    fn not_in(&self, values: &[T]) -> Result<RowSet>;

    /// Returns the set of rows whose value falls within `range`.
    fn range(&self, range: &ValueRange<T>) -> Result<RowSet>;

    /// Returns the value stored at the given row offset.
    fn lookup(&self, offset: u64) -> Result<T>;

    /// Returns the number of indexed rows.
    fn count(&self) -> u64;

    /// Returns the serialized footprint of the index in bytes.
    fn size_in_bytes(&self) -> u64;

    /// Returns `true` if the index can recover original values (i.e. supports
    /// [`lookup`](Self::lookup)).
    fn has_raw_data(&self) -> bool;
}
