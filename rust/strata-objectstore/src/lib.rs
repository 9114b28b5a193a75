//! *Object Store* abstraction: a "storage service" client capable of issuing
//! readers and writers for a given object URL. Index artifacts are written as
//! whole named objects under a container (a "virtual folder") and read back by
//! URL, possibly with ranged reads.

pub mod local_store;
pub mod null_store;
pub mod url;

use std::sync::Arc;

use strata_io::{ReadAt, SealingWrite};
use url::ObjectUrl;

/// The `ObjectStore` trait represents a "storage service" abstraction.
/// It provides the ability to obtain readers for existing objects via their
/// URLs, as well as writers for creating new objects.
pub trait ObjectStore: Send + Sync + 'static {
    /// Opens a reader for an existing object specified by the given URL.
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>>;

    /// Creates a writer for a new object at the specified URL.
    ///
    /// Creation fails if an object already exists at that URL; stores are
    /// write-once at the object level.
    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>>;
}
