//! URL manipulation routines for addressing index artifacts in the
//! `ObjectStore`.
//!
//! All URLs handled here must be clean and canonical:
//! - no credentials in the authority component;
//! - no query or fragment components;
//! - no path traversal sequences;
//! - absolute, in the form `scheme ":" ["//" authority] path`.
//!
//! By convention a URL whose path ends in a slash (`/`) designates a container
//! ("folder"); otherwise the last path component designates an object within
//! its container.

use std::borrow::Cow;

use strata_common::{Result, error::Error};
use url::Url;

/// A URL that has been parsed and verified according to the `ObjectStore`
/// rules and conventions, and is trusted for further manipulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(Url);

impl ObjectUrl {
    /// Creates a new `ObjectUrl` from a `Url` after verifying it.
    pub fn new(url: Url) -> Result<ObjectUrl> {
        Self::verify_url(&url)?;
        Ok(ObjectUrl(url))
    }

    /// Parses a string into an `ObjectUrl` after verifying it.
    ///
    /// Non-canonical forms are rejected: the parsed URL must reassemble to
    /// exactly the input string, which blocks encoded traversal sequences.
    pub fn parse(url_str: &str) -> Result<ObjectUrl> {
        let url = Url::parse(url_str)
            .map_err(|e| Error::invalid_arg("url", format!("'{url_str}': {e}")))?;
        Self::verify_url(&url)?;
        if url.as_str() != url_str {
            return Err(Error::invalid_arg(
                "url",
                format!("'{url_str}' is not in canonical form"),
            ));
        }
        Ok(ObjectUrl(url))
    }

    /// Returns the URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the path component of the URL.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Checks if the URL represents a container (i.e., ends with a `/`).
    pub fn is_container(&self) -> bool {
        self.path().ends_with('/')
    }

    /// Returns the container URL for this URL: the URL itself if it is already
    /// a container, its parent container otherwise.
    pub fn get_container(&self) -> Result<Cow<'_, ObjectUrl>> {
        if self.is_container() {
            Ok(Cow::Borrowed(self))
        } else {
            let parent = self.0.join("./").map_err(|e| {
                Error::invalid_arg("url", format!("cannot take container of '{self:?}': {e}"))
            })?;
            Ok(Cow::Owned(ObjectUrl(parent)))
        }
    }

    /// Resolves a relative path against this URL's container, ensuring the
    /// result does not escape it.
    ///
    /// The relative path must be non-empty, must not start with `/`, and must
    /// not contain traversal segments.
    pub fn resolve_relative(&self, rel_path: &str) -> Result<ObjectUrl> {
        if !is_valid_relative_path(rel_path) {
            return Err(Error::invalid_arg(
                "rel_path",
                format!("'{rel_path}' is not a valid relative path"),
            ));
        }
        let container = self.get_container()?;
        let resolved = container.0.join(rel_path).map_err(|e| {
            Error::invalid_arg("rel_path", format!("cannot resolve '{rel_path}': {e}"))
        })?;
        if !resolved.as_str().starts_with(container.as_str()) {
            return Err(Error::invalid_arg(
                "rel_path",
                format!("'{rel_path}' escapes its container"),
            ));
        }
        Ok(ObjectUrl(resolved))
    }

    /// Attempts to make a given object URL relative to this URL's container.
    ///
    /// Returns `None` if the given URL is a container or lies outside this
    /// container.
    pub fn make_relative(&self, url: &ObjectUrl) -> Option<String> {
        if url.is_container() {
            return None;
        }
        let container = self.get_container().ok()?;
        if url.as_str().starts_with(container.as_str()) {
            container.0.make_relative(&url.0)
        } else {
            None
        }
    }

    /// Determines if the specified `url` refers to an object location confined
    /// within the container of this URL.
    pub fn has_in_scope(&self, url: &ObjectUrl) -> bool {
        let Ok(container) = self.get_container() else {
            return false;
        };
        url.as_str().starts_with(container.as_str())
    }

    fn verify_url(url: &Url) -> Result<()> {
        let clean = url.username().is_empty()
            && url.password().is_none()
            && url.query().is_none()
            && url.fragment().is_none()
            && url.path().starts_with('/')
            && url.path_segments().is_some_and(|mut segments| {
                segments.all(|segment| !is_traversal_segment(segment))
            });
        if clean {
            Ok(())
        } else {
            Err(Error::invalid_arg(
                "url",
                format!("'{}' violates object store url rules", url.as_str()),
            ))
        }
    }
}

impl TryFrom<&str> for ObjectUrl {
    type Error = strata_common::error::Error;

    fn try_from(url_str: &str) -> Result<ObjectUrl> {
        ObjectUrl::parse(url_str)
    }
}

fn is_valid_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains(':')
        && path.split('/').all(|segment| !is_traversal_segment(segment))
}

fn is_traversal_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        ".." | "." | "%2e" | "%2e%2e" | "%2e." | ".%2e"
    )
}

#[cfg(test)]
mod tests {
    use super::ObjectUrl;

    #[test]
    fn test_parse_accepts_canonical_urls() {
        let url = ObjectUrl::parse("file:///data/index/").unwrap();
        assert!(url.is_container());

        let url = ObjectUrl::parse("file:///data/index/blob.bin").unwrap();
        assert!(!url.is_container());
        assert_eq!(url.path(), "/data/index/blob.bin");
    }

    #[test]
    fn test_parse_rejects_unclean_urls() {
        assert!(ObjectUrl::parse("file:///data/?q=1").is_err());
        assert!(ObjectUrl::parse("file:///data/#frag").is_err());
        assert!(ObjectUrl::parse("https://user:pw@host/data").is_err());
        assert!(ObjectUrl::parse("file:///data/../other").is_err());
    }

    #[test]
    fn test_resolve_relative() {
        let container = ObjectUrl::parse("file:///data/index/").unwrap();
        let blob = container.resolve_relative("part/blob.bin").unwrap();
        assert_eq!(blob.as_str(), "file:///data/index/part/blob.bin");
        assert!(container.has_in_scope(&blob));

        assert!(container.resolve_relative("../escape").is_err());
        assert!(container.resolve_relative("/absolute").is_err());
        assert!(container.resolve_relative("").is_err());
    }

    #[test]
    fn test_container_of_object_url() {
        let blob = ObjectUrl::parse("file:///data/index/blob.bin").unwrap();
        let container = blob.get_container().unwrap();
        assert_eq!(container.as_str(), "file:///data/index/");
    }

    #[test]
    fn test_make_relative() {
        let container = ObjectUrl::parse("file:///data/index/").unwrap();
        let blob = container.resolve_relative("blob.bin").unwrap();
        assert_eq!(container.make_relative(&blob).unwrap(), "blob.bin");

        let outside = ObjectUrl::parse("file:///elsewhere/blob.bin").unwrap();
        assert!(container.make_relative(&outside).is_none());
    }
}
