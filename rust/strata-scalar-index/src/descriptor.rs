//! Self-describing index descriptor.
//!
//! The descriptor is a small fixed-size record persisted under a reserved blob
//! name ahead of any variant-specific artifacts. It is the only part of the
//! on-disk format owned by the dispatch layer: a loader reads it first,
//! recovers which encoding was materialized and for which element type, and
//! only then constructs the matching implementation. Everything else on disk
//! is the variant's own serialization, treated as opaque named bytes.

use strata_common::{Result, error::Error};

use crate::scalar_value::ValueType;

/// Reserved blob name of the descriptor. Variant blob names must never use it.
pub const DESCRIPTOR_BLOB: &str = "index.descriptor";

/// Tag of the physical index encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// One row bitmap per distinct value; chosen for low-cardinality columns.
    Bitmap = 1,
    /// Sorted value array with binary-search queries; the general fallback.
    Sorted = 2,
    /// Byte-wise trie over distinct keys; chosen for high-cardinality string
    /// columns.
    Trie = 3,
}

impl IndexKind {
    /// Returns the persisted one-byte tag of this kind.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a persisted tag, returning `None` for unknown tags.
    pub fn from_code(code: u8) -> Option<IndexKind> {
        match code {
            1 => Some(IndexKind::Bitmap),
            2 => Some(IndexKind::Sorted),
            3 => Some(IndexKind::Trie),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndexKind::Bitmap => "bitmap",
            IndexKind::Sorted => "sorted",
            IndexKind::Trie => "trie",
        };
        f.write_str(name)
    }
}

/// The persisted descriptor record.
///
/// Layout (8 bytes, little-endian): 4-byte magic, format version, encoding
/// tag, element type code, reserved zero byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub kind: IndexKind,
    pub value_type: ValueType,
}

impl IndexDescriptor {
    pub const ENCODED_LEN: usize = 8;

    const MAGIC: [u8; 4] = *b"STIX";
    const VERSION: u8 = 1;

    pub fn new(kind: IndexKind, value_type: ValueType) -> IndexDescriptor {
        IndexDescriptor { kind, value_type }
    }

    /// Encodes the descriptor into its fixed-size record.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut record = [0u8; Self::ENCODED_LEN];
        record[..4].copy_from_slice(&Self::MAGIC);
        record[4] = Self::VERSION;
        record[5] = self.kind.code();
        record[6] = self.value_type.code();
        record
    }

    /// Decodes a descriptor record.
    ///
    /// Any deviation (wrong size, bad magic, unknown version, unknown tag or
    /// type code) is a corrupt index: the loader must never guess a default
    /// variant.
    pub fn decode(record: &[u8]) -> Result<IndexDescriptor> {
        if record.len() != Self::ENCODED_LEN {
            return Err(Error::corrupt(
                DESCRIPTOR_BLOB,
                format!(
                    "descriptor is {} bytes, expected {}",
                    record.len(),
                    Self::ENCODED_LEN
                ),
            ));
        }
        if record[..4] != Self::MAGIC {
            return Err(Error::corrupt(DESCRIPTOR_BLOB, "bad magic"));
        }
        if record[4] != Self::VERSION {
            return Err(Error::corrupt(
                DESCRIPTOR_BLOB,
                format!("unsupported format version {}", record[4]),
            ));
        }
        let kind = IndexKind::from_code(record[5]).ok_or_else(|| {
            Error::corrupt(
                DESCRIPTOR_BLOB,
                format!("unrecognized index kind tag {}", record[5]),
            )
        })?;
        let value_type = ValueType::from_code(record[6]).ok_or_else(|| {
            Error::corrupt(
                DESCRIPTOR_BLOB,
                format!("unrecognized element type code {}", record[6]),
            )
        })?;
        Ok(IndexDescriptor { kind, value_type })
    }
}
