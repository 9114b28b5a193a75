//! Named binary blobs produced by serialization and consumed by loading.

use std::collections::BTreeMap;

use strata_bytes::Bytes;
use strata_common::{Result, error::Error};

/// A source of named blobs for the load path.
///
/// Two implementations exist: the fully materialized in-memory [`BlobSet`],
/// and the store-backed [`StoredBlobs`](crate::store::StoredBlobs) which
/// fetches blob bytes on demand, letting a loader resolve the descriptor
/// before any variant-body bytes are pulled.
pub trait BlobSource {
    /// Returns the names of all blobs available from this source.
    fn blob_names(&self) -> Vec<String>;

    /// Reads the blob with the given name.
    ///
    /// A missing blob is a corrupt index, not an empty result.
    fn read_blob(&self, name: &str) -> Result<Bytes>;
}

/// An owned collection of uniquely named byte buffers.
///
/// Keys are unique and unordered; the collection always contains the reserved
/// descriptor blob plus whatever blobs the chosen variant emitted. Ownership
/// is transferred to the caller when returned from serialization.
#[derive(Debug, Clone, Default)]
pub struct BlobSet {
    blobs: BTreeMap<String, Bytes>,
}

impl BlobSet {
    pub fn new() -> BlobSet {
        BlobSet::default()
    }

    /// Adds a named blob, rejecting duplicate names.
    pub fn insert(&mut self, name: impl Into<String>, data: Bytes) -> Result<()> {
        let name = name.into();
        if self.blobs.contains_key(&name) {
            return Err(Error::invalid_arg(
                "name",
                format!("duplicate blob name '{name}'"),
            ));
        }
        self.blobs.insert(name, data);
        Ok(())
    }

    /// Returns the blob with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.blobs.get(name)
    }

    /// Removes and returns the blob with the given name, if present.
    pub fn remove(&mut self, name: &str) -> Option<Bytes> {
        self.blobs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Iterates over `(name, data)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.blobs.iter().map(|(name, data)| (name.as_str(), data))
    }
}

impl BlobSource for BlobSet {
    fn blob_names(&self) -> Vec<String> {
        self.blobs.keys().cloned().collect()
    }

    fn read_blob(&self, name: &str) -> Result<Bytes> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::corrupt(name, "missing blob"))
    }
}
