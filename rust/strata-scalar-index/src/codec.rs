//! Little-endian decoding cursor used by the descriptor and variant load
//! paths. Truncated or trailing bytes surface as corrupt-index errors carrying
//! the blob name being decoded.

use strata_common::{Result, error::Error};

use crate::scalar_value::ScalarValue;

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    element: &'a str,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], element: &'a str) -> Reader<'a> {
        Reader {
            buf,
            pos: 0,
            element,
        }
    }

    pub fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    pub fn value<T: ScalarValue>(&mut self) -> Result<T> {
        let (value, consumed) = T::decode_from(&self.buf[self.pos..])
            .map_err(|e| Error::corrupt(self.element, e.to_string()))?;
        self.pos += consumed;
        Ok(value)
    }

    /// Fails unless the cursor consumed the buffer exactly.
    pub fn expect_end(&self) -> Result<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(Error::corrupt(
                self.element,
                format!("{} trailing bytes after decoded content", self.buf.len() - self.pos),
            ))
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::corrupt(self.element, "truncated blob")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;

    #[test]
    fn test_reads_and_end_check() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u64.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());

        let mut reader = Reader::new(&buf, "test.blob");
        assert_eq!(reader.u64().unwrap(), 7);
        assert_eq!(reader.u32().unwrap(), 3);
        reader.expect_end().unwrap();
    }

    #[test]
    fn test_truncation_and_trailing_bytes() {
        let buf = 1u32.to_le_bytes();
        let mut reader = Reader::new(&buf, "test.blob");
        assert!(reader.u64().is_err());

        let mut reader = Reader::new(&buf, "test.blob");
        let _ = reader.u32().unwrap();
        let mut with_tail = buf.to_vec();
        with_tail.push(0);
        let reader2 = {
            let mut r = Reader::new(&with_tail, "test.blob");
            let _ = r.u32().unwrap();
            r
        };
        assert!(reader.expect_end().is_ok());
        assert!(reader2.expect_end().is_err());
    }

    #[test]
    fn test_decodes_values() {
        let mut buf = Vec::new();
        use crate::scalar_value::ScalarValue;
        42i64.encode_into(&mut buf);
        "ab".to_string().encode_into(&mut buf);

        let mut reader = Reader::new(&buf, "test.blob");
        assert_eq!(reader.value::<i64>().unwrap(), 42);
        assert_eq!(reader.value::<String>().unwrap(), "ab");
        reader.expect_end().unwrap();
    }
}
