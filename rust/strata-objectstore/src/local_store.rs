//! Local filesystem implementation of the `ObjectStore` trait.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use strata_io::{
    ReadAt, SealingWrite,
    file::{FileReader, FileWriter},
};

use crate::{ObjectStore, url::ObjectUrl};

/// An `ObjectStore` implementation that manages objects on the local
/// filesystem, confined to a specified container directory.
///
/// The container directory acts as a virtual root: the path component of every
/// object URL is interpreted as relative to it, so `file:///a/b.bin` maps to
/// `<container>/a/b.bin`. Object URLs can never address files outside the
/// container.
pub struct LocalFsObjectStore {
    /// The top-level directory for this object store.
    container_path: PathBuf,
}

impl LocalFsObjectStore {
    /// Creates a new `LocalFsObjectStore` rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(container_path: &Path) -> strata_common::Result<LocalFsObjectStore> {
        std::fs::create_dir_all(container_path).map_err(|e| {
            strata_common::error::Error::io(container_path.display().to_string(), e)
        })?;
        Ok(LocalFsObjectStore {
            container_path: container_path.to_path_buf(),
        })
    }

    /// Returns the file system path of the store's top-level container.
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Converts an [`ObjectUrl`] to a local filesystem path within the
    /// container.
    pub fn url_to_path(&self, url: &ObjectUrl) -> std::io::Result<PathBuf> {
        let relative = url.path().trim_start_matches('/');
        if relative.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' does not address an object", url.as_str()),
            ));
        }
        Ok(self.container_path.join(relative))
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>> {
        let path = self.url_to_path(url)?;
        Ok(Arc::new(FileReader::open(path)?))
    }

    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>> {
        let path = self.url_to_path(url)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Box::new(FileWriter::create(path)?))
    }
}
