//! Element-type abstraction for indexable scalar values.
//!
//! Every column type that can be indexed implements [`ScalarValue`]: a total
//! order that is safe for floating point, a canonical little-endian byte
//! encoding used both for persistence and for distinct-value hashing, and the
//! persisted [`ValueType`] code that lets a loader detect element-type
//! mismatches.

use std::cmp::Ordering;

use strata_common::{Result, error::Error};

use crate::{BlobSource, ScalarIndex, trie::TrieIndex};

/// Persisted code identifying the element type of an index.
///
/// The code is written into the index descriptor so that loading a persisted
/// index with the wrong element type fails with a type mismatch instead of
/// misinterpreting the variant's bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    String = 12,
}

impl ValueType {
    /// Returns the persisted one-byte code of this type.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a persisted type code, returning `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<ValueType> {
        match code {
            1 => Some(ValueType::Bool),
            2 => Some(ValueType::Int8),
            3 => Some(ValueType::Int16),
            4 => Some(ValueType::Int32),
            5 => Some(ValueType::Int64),
            6 => Some(ValueType::UInt8),
            7 => Some(ValueType::UInt16),
            8 => Some(ValueType::UInt32),
            9 => Some(ValueType::UInt64),
            10 => Some(ValueType::Float32),
            11 => Some(ValueType::Float64),
            12 => Some(ValueType::String),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Bool => "Bool",
            ValueType::Int8 => "Int8",
            ValueType::Int16 => "Int16",
            ValueType::Int32 => "Int32",
            ValueType::Int64 => "Int64",
            ValueType::UInt8 => "UInt8",
            ValueType::UInt16 => "UInt16",
            ValueType::UInt32 => "UInt32",
            ValueType::UInt64 => "UInt64",
            ValueType::Float32 => "Float32",
            ValueType::Float64 => "Float64",
            ValueType::String => "String",
        };
        f.write_str(name)
    }
}

/// A scalar element type that can be indexed.
///
/// The canonical encoding is little-endian and self-delimiting: fixed width
/// for numeric types, length-prefixed UTF-8 for strings. The same encoding is
/// used as the hash key for distinct-value counting, so two values compare
/// equal under [`total_cmp`](Self::total_cmp) iff their encodings are equal.
/// For floats this keys on the bit pattern: `-0.0` and `+0.0` (and distinct
/// NaN payloads) are distinct index keys.
pub trait ScalarValue: Clone + Send + Sync + 'static {
    /// The persisted type code of this element type.
    const TYPE: ValueType;

    /// Whether the trie encoding is defined for this element type.
    const SUPPORTS_TRIE: bool = false;

    /// Total ordering over values, defined for every representable value.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Returns the canonical encoded length of this value in bytes.
    fn encoded_len(&self) -> usize;

    /// Appends the canonical encoding of this value to `buf`.
    fn encode_into(&self, buf: &mut Vec<u8>);

    /// Decodes one value from the front of `buf`, returning the value and the
    /// number of bytes consumed.
    fn decode_from(buf: &[u8]) -> Result<(Self, usize)>;

    /// Builds a trie index over `values`.
    ///
    /// Only defined for string types; the default rejects the request, and the
    /// selection policy never chooses the trie for types that do not support
    /// it.
    fn build_trie(_values: &[Self]) -> Result<Box<dyn ScalarIndex<Self>>> {
        Err(trie_unsupported::<Self>())
    }

    /// Loads a trie index from persisted blobs.
    ///
    /// Only defined for string types; for any other type a persisted trie tag
    /// is a corrupt descriptor.
    fn load_trie(_source: &dyn BlobSource) -> Result<Box<dyn ScalarIndex<Self>>> {
        Err(trie_unsupported::<Self>())
    }
}

fn trie_unsupported<T: ScalarValue>() -> Error {
    Error::corrupt(
        crate::DESCRIPTOR_BLOB,
        format!("trie index is not defined for element type {}", T::TYPE),
    )
}

macro_rules! impl_scalar_value_for_int {
    ($($ty:ty => $tag:ident),* $(,)?) => {$(
        impl ScalarValue for $ty {
            const TYPE: ValueType = ValueType::$tag;

            fn total_cmp(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }

            fn encoded_len(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            fn encode_into(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn decode_from(buf: &[u8]) -> Result<(Self, usize)> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let bytes: [u8; WIDTH] = buf
                    .get(..WIDTH)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| Error::corrupt("value", "truncated fixed-width value"))?;
                Ok((<$ty>::from_le_bytes(bytes), WIDTH))
            }
        }
    )*};
}

impl_scalar_value_for_int!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

macro_rules! impl_scalar_value_for_float {
    ($($ty:ty => $tag:ident : $bits:ty),* $(,)?) => {$(
        impl ScalarValue for $ty {
            const TYPE: ValueType = ValueType::$tag;

            fn total_cmp(&self, other: &Self) -> Ordering {
                <$ty>::total_cmp(self, other)
            }

            fn encoded_len(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            fn encode_into(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_bits().to_le_bytes());
            }

            fn decode_from(buf: &[u8]) -> Result<(Self, usize)> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let bytes: [u8; WIDTH] = buf
                    .get(..WIDTH)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| Error::corrupt("value", "truncated fixed-width value"))?;
                Ok((<$ty>::from_bits(<$bits>::from_le_bytes(bytes)), WIDTH))
            }
        }
    )*};
}

impl_scalar_value_for_float!(
    f32 => Float32 : u32,
    f64 => Float64 : u64,
);

impl ScalarValue for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    fn encoded_len(&self) -> usize {
        1
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }

    fn decode_from(buf: &[u8]) -> Result<(Self, usize)> {
        match buf.first() {
            Some(0) => Ok((false, 1)),
            Some(1) => Ok((true, 1)),
            Some(b) => Err(Error::corrupt("value", format!("invalid boolean byte {b}"))),
            None => Err(Error::corrupt("value", "truncated boolean value")),
        }
    }
}

impl ScalarValue for String {
    const TYPE: ValueType = ValueType::String;
    const SUPPORTS_TRIE: bool = true;

    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    fn encoded_len(&self) -> usize {
        4 + self.len()
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        assert!(self.len() <= u32::MAX as usize);
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.as_bytes());
    }

    fn decode_from(buf: &[u8]) -> Result<(Self, usize)> {
        let len_bytes: [u8; 4] = buf
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| Error::corrupt("value", "truncated string length"))?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let bytes = buf
            .get(4..4 + len)
            .ok_or_else(|| Error::corrupt("value", "truncated string payload"))?;
        let value = std::str::from_utf8(bytes)
            .map_err(|_| Error::corrupt("value", "string payload is not valid UTF-8"))?;
        Ok((value.to_string(), 4 + len))
    }

    fn build_trie(values: &[String]) -> Result<Box<dyn ScalarIndex<String>>> {
        Ok(Box::new(TrieIndex::build(values)?))
    }

    fn load_trie(source: &dyn BlobSource) -> Result<Box<dyn ScalarIndex<String>>> {
        Ok(Box::new(TrieIndex::load(source)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{ScalarValue, ValueType};

    fn round_trip<T: ScalarValue + PartialEq + std::fmt::Debug>(value: T) {
        let mut buf = Vec::new();
        value.encode_into(&mut buf);
        assert_eq!(buf.len(), value.encoded_len());
        let (decoded, consumed) = T::decode_from(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_encode_round_trips() {
        round_trip(true);
        round_trip(-42i8);
        round_trip(i64::MIN);
        round_trip(u64::MAX);
        round_trip(3.5f32);
        round_trip(-0.0f64);
        round_trip(String::new());
        round_trip("hello".to_string());
    }

    #[test]
    fn test_decode_rejects_truncation() {
        assert!(i64::decode_from(&[1, 2, 3]).is_err());
        assert!(bool::decode_from(&[]).is_err());
        assert!(bool::decode_from(&[7]).is_err());
        assert!(String::decode_from(&[5, 0, 0, 0, b'a']).is_err());
        assert!(String::decode_from(&[255, 255]).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xff, 0xfe]);
        assert!(String::decode_from(&buf).is_err());
    }

    #[test]
    fn test_float_total_order() {
        use std::cmp::Ordering;
        assert_eq!((-0.0f64).total_cmp(&0.0), Ordering::Less);
        assert_eq!(f64::NAN.total_cmp(&f64::INFINITY), Ordering::Greater);
        assert_eq!(1.5f64.total_cmp(&1.5), Ordering::Equal);
    }

    #[test]
    fn test_type_codes_are_stable() {
        for ty in [
            ValueType::Bool,
            ValueType::Int8,
            ValueType::Int64,
            ValueType::Float64,
            ValueType::String,
        ] {
            assert_eq!(ValueType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(ValueType::from_code(0), None);
        assert_eq!(ValueType::from_code(200), None);
    }
}
