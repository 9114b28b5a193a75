//! Persistence of serialized indexes against an object store.
//!
//! Every blob of a serialized index is written as its own named object under a
//! container ("virtual folder"), together with a JSON manifest object that
//! enumerates the blob names and sizes. The manifest is what a later load
//! needs to find the blobs; [`StoredBlobs`] adapts a store plus manifest into
//! a lazy [`BlobSource`] that fetches blob bytes on demand.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_bytes::Bytes;
use strata_common::{Result, error::Error};
use strata_io::{ReadAt, SealingWrite};
use strata_objectstore::{ObjectStore, url::ObjectUrl};

use crate::blobs::{BlobSet, BlobSource};

/// Name of the manifest object within an index container.
pub const MANIFEST_BLOB: &str = "index.manifest";

/// One persisted blob recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
}

/// Enumeration of the persisted blobs of one index under a container.
#[derive(Debug, Clone)]
pub struct IndexManifest {
    container: ObjectUrl,
    entries: Vec<ManifestEntry>,
}

impl IndexManifest {
    /// Returns the container all blobs live under.
    pub fn container(&self) -> &ObjectUrl {
        &self.container
    }

    /// Returns the recorded blob entries.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Returns `true` if a blob with the given name is recorded.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Reads and parses the manifest object persisted under `container`.
    pub fn fetch(store: &dyn ObjectStore, container: &ObjectUrl) -> Result<IndexManifest> {
        let url = container.resolve_relative(MANIFEST_BLOB)?;
        let bytes = read_object(store, &url)?;
        let entries: Vec<ManifestEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupt(MANIFEST_BLOB, e.to_string()))?;
        Ok(IndexManifest {
            container: container.clone(),
            entries,
        })
    }
}

/// Writes every blob of `blobs` as an object under `container`, then writes
/// the manifest object, and returns the manifest.
pub(crate) fn upload_blobs(
    store: &dyn ObjectStore,
    container: &ObjectUrl,
    blobs: &BlobSet,
) -> Result<IndexManifest> {
    if !container.is_container() {
        return Err(Error::invalid_arg(
            "container",
            format!("'{}' is not a container url", container.as_str()),
        ));
    }
    let mut entries = Vec::with_capacity(blobs.len());
    for (name, data) in blobs.iter() {
        write_object(store, &container.resolve_relative(name)?, data)?;
        entries.push(ManifestEntry {
            name: name.to_string(),
            size: data.len() as u64,
        });
    }
    let manifest_json = serde_json::to_vec(&entries)
        .map_err(|e| Error::invalid_operation(format!("encode manifest: {e}")))?;
    write_object(
        store,
        &container.resolve_relative(MANIFEST_BLOB)?,
        &manifest_json,
    )?;
    Ok(IndexManifest {
        container: container.clone(),
        entries,
    })
}

/// A lazy [`BlobSource`] over persisted blobs.
///
/// Blob bytes are fetched from the store only when read, so a loader can
/// resolve the descriptor blob before any variant-body bytes are pulled.
pub struct StoredBlobs {
    store: Arc<dyn ObjectStore>,
    manifest: IndexManifest,
}

impl StoredBlobs {
    pub fn new(store: Arc<dyn ObjectStore>, manifest: IndexManifest) -> StoredBlobs {
        StoredBlobs { store, manifest }
    }
}

impl BlobSource for StoredBlobs {
    fn blob_names(&self) -> Vec<String> {
        self.manifest
            .entries()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    fn read_blob(&self, name: &str) -> Result<Bytes> {
        if !self.manifest.contains(name) {
            return Err(Error::corrupt(
                name,
                "blob is not recorded in the index manifest",
            ));
        }
        let url = self.manifest.container().resolve_relative(name)?;
        read_object(self.store.as_ref(), &url)
    }
}

fn read_object(store: &dyn ObjectStore, url: &ObjectUrl) -> Result<Bytes> {
    let reader = store
        .open(url)
        .map_err(|e| Error::io(url.as_str().to_string(), e))?;
    let size = reader
        .size()
        .map_err(|e| Error::io(url.as_str().to_string(), e))?;
    reader
        .read_at(0..size)
        .map_err(|e| Error::io(url.as_str().to_string(), e))
}

fn write_object(store: &dyn ObjectStore, url: &ObjectUrl, data: &[u8]) -> Result<()> {
    let mut writer = store
        .create(url)
        .map_err(|e| Error::io(url.as_str().to_string(), e))?;
    writer
        .write_all(data)
        .map_err(|e| Error::io(url.as_str().to_string(), e))?;
    writer
        .seal()
        .map_err(|e| Error::io(url.as_str().to_string(), e))
}
