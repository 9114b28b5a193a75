//! I/O abstractions:
//! - `ReadAt`: positional reader with the ability to fetch a specified byte range
//!   from a file/blob.
//! - `SealingWrite`: sequential writer with a `seal()` operation, committing the
//!   write activity.
//!
//! Provides simple memory-based and file-based implementations.

use std::{ops::Range, sync::Arc};

use strata_bytes::Bytes;

pub mod file;

/// A trait representing a conceptual file or buffer that supports reading from
/// arbitrary positions.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads a specified range of bytes from the object.
    ///
    /// The function may return fewer bytes than requested if the range extends
    /// beyond the end of the object; it does not otherwise return short reads.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;
}

/// A trait for sequential writing with explicit sealing semantics.
///
/// Unlike [`std::io::Write`], a writer must be explicitly sealed for the data
/// to become durable and visible to readers; this maps onto storage backends
/// with an explicit commit step. Once sealed, a writer accepts no further
/// writes.
pub trait SealingWrite: Send {
    /// Appends the entire buffer to the previously written data.
    ///
    /// Either all bytes are written, or an error is returned with no partial
    /// write.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes and commits all written data to the underlying storage.
    fn seal(&mut self) -> std::io::Result<()>;
}

impl ReadAt for Bytes {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        read_at_slice(self, range, |r| self.slice(r))
    }
}

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        read_at_slice(self, range, |r| Bytes::copy_from_slice(&self[r]))
    }
}

fn read_at_slice(
    content: &[u8],
    range: Range<u64>,
    slice: impl Fn(Range<usize>) -> Bytes,
) -> std::io::Result<Bytes> {
    if range.end < range.start {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "read_at: inverted range",
        ));
    }
    let pos = range.start as usize;
    let len = (range.end - range.start) as usize;
    if pos > content.len() {
        return Ok(Bytes::new());
    }
    let len = std::cmp::min(len, content.len() - pos);
    Ok(slice(pos..pos + len))
}

impl SealingWrite for Vec<u8> {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.as_ref().read_at(range)
    }
}

impl<T> SealingWrite for Box<T>
where
    T: SealingWrite + ?Sized,
{
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.as_mut().write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        self.as_mut().seal()
    }
}
