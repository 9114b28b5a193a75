//! File-backed implementations of the I/O traits.

use std::{
    fs::File,
    io::Write,
    ops::Range,
    path::Path,
    sync::{Arc, OnceLock},
};

use strata_bytes::Bytes;

use crate::{ReadAt, SealingWrite};

/// Positional reader over a file, using pread-style access so concurrent reads
/// need no seek coordination.
pub struct FileReader {
    file: Arc<File>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            size: Default::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileReader> {
        Ok(FileReader::new(File::open(path)?))
    }

    fn get_size(&self) -> std::io::Result<u64> {
        if let Some(&size) = self.size.get() {
            Ok(size)
        } else {
            let size = self.file.metadata()?.len();
            let _ = self.size.set(size);
            Ok(size)
        }
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.get_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        if range.end < range.start {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "read_at: inverted range",
            ));
        }
        let size = self.get_size()?;
        if range.start >= size || range.start == range.end {
            return Ok(Bytes::new());
        }
        let range = range.start..std::cmp::min(range.end, size);
        let mut buf = vec![0u8; (range.end - range.start) as usize];
        file_read_at_exact(&self.file, range.start, &mut buf)?;
        Ok(Bytes::from(buf))
    }
}

/// Sequential file writer; `seal` flushes and syncs the file to durable
/// storage.
pub struct FileWriter {
    file: Option<File>,
}

impl FileWriter {
    pub fn new(file: File) -> FileWriter {
        FileWriter { file: Some(file) }
    }

    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter::new(File::create_new(path)?))
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?
            .write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(unix)]
fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)?;
    Ok(())
}

#[cfg(windows)]
fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos) {
            Ok(0) => break,
            Ok(n) => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
            Err(e) => return Err(e),
        }
    }
    if !buf.is_empty() {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        ReadAt, SealingWrite,
        file::{FileReader, FileWriter},
    };

    #[test]
    fn test_file_reader_and_writer() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("test.bin");
        let mut writer = FileWriter::create(&path).expect("create file");
        for _ in 0..10 {
            writer.write_all(b"abcdefgh").expect("write_all");
        }
        writer.seal().expect("seal");

        let reader = FileReader::open(&path).expect("open file");
        for pos in (0..80).step_by(8) {
            let buf = reader.read_at(pos..pos + 4).expect("read_at");
            assert_eq!(buf.as_ref(), b"abcd");
        }
        assert_eq!(reader.size().unwrap(), 80);
    }
}
