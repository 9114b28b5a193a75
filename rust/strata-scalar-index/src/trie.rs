//! Trie index for high-cardinality string columns.
//!
//! Distinct keys are held in a byte-wise trie, so shared prefixes are stored
//! once. Key ids are implicit: the id of a key is its lexicographic rank among
//! all distinct keys. Each node tracks the number of keys in its subtree,
//! which makes the rank of an arbitrary bound string computable in a single
//! walk; range queries then reduce to an id window, and reverse lookup
//! reconstructs a key from its id by descending the counts.

use std::collections::BTreeMap;

use strata_bytes::Bytes;
use strata_common::{Result, verify_arg, verify_data};
use strata_rowset::RowSet;

use crate::{
    BlobSet, BlobSource, IndexKind, ScalarIndex, codec::Reader, query::ValueRange,
    scalar_value::ScalarValue,
};

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<u8, u32>,
    terminal: bool,
    /// Number of keys ending at or below this node.
    subtree_keys: u32,
}

/// Trie index over a string column.
pub struct TrieIndex {
    /// Trie nodes; node 0 is the root.
    nodes: Vec<TrieNode>,
    /// Row bitmap per key id (lexicographic rank of the key).
    key_rows: Vec<RowSet>,
    /// Key id of each row offset.
    row_keys: Vec<u32>,
    /// Total byte length of all distinct keys.
    key_bytes: u64,
}

impl TrieIndex {
    pub(crate) const KEYS_BLOB: &'static str = "trie.keys";
    pub(crate) const ROWS_BLOB: &'static str = "trie.rows";

    /// Builds the index from raw column values.
    pub fn build(values: &[String]) -> Result<TrieIndex> {
        verify_arg!(values, values.len() <= u32::MAX as usize);
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, value) in values.iter().enumerate() {
            groups.entry(value.as_str()).or_default().push(row);
        }

        let mut nodes = vec![TrieNode::default()];
        let mut key_rows = Vec::with_capacity(groups.len());
        let mut row_keys = vec![0u32; values.len()];
        let mut key_bytes = 0u64;
        for (id, (key, rows)) in groups.into_iter().enumerate() {
            insert_key(&mut nodes, key);
            key_bytes += key.len() as u64;
            for &row in &rows {
                row_keys[row] = id as u32;
            }
            key_rows.push(RowSet::from_positions(values.len(), rows));
        }
        Ok(TrieIndex {
            nodes,
            key_rows,
            row_keys,
            key_bytes,
        })
    }

    /// Loads the index from its persisted blobs.
    pub fn load(source: &dyn BlobSource) -> Result<TrieIndex> {
        let keys_blob = source.read_blob(Self::KEYS_BLOB)?;
        let mut reader = Reader::new(&keys_blob, Self::KEYS_BLOB);
        let row_count = reader.u64()? as usize;
        let key_count = reader.u32()? as usize;
        let mut keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            keys.push(reader.value::<String>()?);
        }
        reader.expect_end()?;
        verify_data!(trie.keys, keys.windows(2).all(|pair| pair[0] < pair[1]));

        let rows_blob = source.read_blob(Self::ROWS_BLOB)?;
        verify_data!(trie.rows, rows_blob.len() == row_count * 4);
        let row_keys: Vec<u32> = rows_blob
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("4 bytes")))
            .collect();
        verify_data!(trie.rows, row_keys.iter().all(|&id| (id as usize) < key_count));

        let mut nodes = vec![TrieNode::default()];
        let mut key_bytes = 0u64;
        for key in &keys {
            insert_key(&mut nodes, key);
            key_bytes += key.len() as u64;
        }
        let mut key_rows = vec![RowSet::empty(row_count); key_count];
        for (row, &id) in row_keys.iter().enumerate() {
            key_rows[id as usize].set(row);
        }
        Ok(TrieIndex {
            nodes,
            key_rows,
            row_keys,
            key_bytes,
        })
    }

    /// Walks the trie along `key`, returning the number of keys strictly less
    /// than `key` and the node at the end of the full path, if the whole path
    /// exists.
    fn locate(&self, key: &str) -> (u32, Option<usize>) {
        let mut node = 0usize;
        let mut rank = 0u32;
        for &byte in key.as_bytes() {
            let current = &self.nodes[node];
            if current.terminal {
                rank += 1;
            }
            for (_, &child) in current.children.range(..byte) {
                rank += self.nodes[child as usize].subtree_keys;
            }
            match current.children.get(&byte) {
                Some(&child) => node = child as usize,
                None => return (rank, None),
            }
        }
        (rank, Some(node))
    }

    fn key_id(&self, key: &str) -> Option<u32> {
        let (rank, node) = self.locate(key);
        node.filter(|&node| self.nodes[node].terminal).map(|_| rank)
    }

    /// Translates a value range into a half-open window of key ids.
    fn id_window(&self, range: &ValueRange<String>) -> (u32, u32) {
        let lo = match range.lower() {
            None => 0,
            Some((bound, inclusive)) => {
                let (rank, node) = self.locate(bound);
                let exists = node.is_some_and(|node| self.nodes[node].terminal);
                if inclusive { rank } else { rank + exists as u32 }
            }
        };
        let hi = match range.upper() {
            None => self.key_rows.len() as u32,
            Some((bound, inclusive)) => {
                let (rank, node) = self.locate(bound);
                let exists = node.is_some_and(|node| self.nodes[node].terminal);
                if inclusive { rank + exists as u32 } else { rank }
            }
        };
        (lo, hi.max(lo))
    }

    /// Reconstructs the key with the given id by descending the subtree
    /// counts.
    fn key_for_id(&self, id: u32) -> String {
        debug_assert!((id as usize) < self.key_rows.len());
        let mut remaining = id;
        let mut bytes = Vec::new();
        let mut node = 0usize;
        'descend: loop {
            let current = &self.nodes[node];
            if current.terminal {
                if remaining == 0 {
                    break;
                }
                remaining -= 1;
            }
            for (&byte, &child) in &current.children {
                let count = self.nodes[child as usize].subtree_keys;
                if remaining < count {
                    bytes.push(byte);
                    node = child as usize;
                    continue 'descend;
                }
                remaining -= count;
            }
            unreachable!("key id exceeds trie key count");
        }
        String::from_utf8(bytes).expect("trie keys are valid UTF-8")
    }

    fn collect_keys(&self, node: usize, prefix: &mut Vec<u8>, out: &mut Vec<String>) {
        let current = &self.nodes[node];
        if current.terminal {
            out.push(String::from_utf8(prefix.clone()).expect("trie keys are valid UTF-8"));
        }
        for (&byte, &child) in &current.children {
            prefix.push(byte);
            self.collect_keys(child as usize, prefix, out);
            prefix.pop();
        }
    }

    fn union_of(&self, ids: std::ops::Range<u32>) -> RowSet {
        let mut result = RowSet::empty(self.row_keys.len());
        for id in ids {
            result.union_with(&self.key_rows[id as usize]);
        }
        result
    }
}

impl ScalarIndex<String> for TrieIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Trie
    }

    fn serialize(&self, blobs: &mut BlobSet) -> Result<()> {
        let mut ordered_keys = Vec::with_capacity(self.key_rows.len());
        self.collect_keys(0, &mut Vec::new(), &mut ordered_keys);

        let mut keys = Vec::new();
        keys.extend_from_slice(&(self.row_keys.len() as u64).to_le_bytes());
        keys.extend_from_slice(&(ordered_keys.len() as u32).to_le_bytes());
        for key in &ordered_keys {
            key.encode_into(&mut keys);
        }
        blobs.insert(Self::KEYS_BLOB, Bytes::from(keys))?;

        let mut rows = Vec::with_capacity(self.row_keys.len() * 4);
        for &id in &self.row_keys {
            rows.extend_from_slice(&id.to_le_bytes());
        }
        blobs.insert(Self::ROWS_BLOB, Bytes::from(rows))?;
        Ok(())
    }

    fn is_in(&self, values: &[String]) -> Result<RowSet> {
        let mut result = RowSet::empty(self.row_keys.len());
        for value in values {
            if let Some(id) = self.key_id(value) {
                result.union_with(&self.key_rows[id as usize]);
            }
        }
        Ok(result)
    }

    fn not_in(&self, values: &[String]) -> Result<RowSet> {
        let mut result = self.is_in(values)?;
        result.invert();
        Ok(result)
    }

    fn range(&self, range: &ValueRange<String>) -> Result<RowSet> {
        let (lo, hi) = self.id_window(range);
        Ok(self.union_of(lo..hi))
    }

    fn lookup(&self, offset: u64) -> Result<String> {
        verify_arg!(offset, offset < self.row_keys.len() as u64);
        Ok(self.key_for_id(self.row_keys[offset as usize]))
    }

    fn count(&self) -> u64 {
        self.row_keys.len() as u64
    }

    fn size_in_bytes(&self) -> u64 {
        12 + self.key_bytes
            + self.key_rows.len() as u64 * 4
            + self.row_keys.len() as u64 * 4
    }

    fn has_raw_data(&self) -> bool {
        true
    }
}

fn insert_key(nodes: &mut Vec<TrieNode>, key: &str) {
    let mut node = 0usize;
    nodes[node].subtree_keys += 1;
    for &byte in key.as_bytes() {
        let next = match nodes[node].children.get(&byte) {
            Some(&child) => child as usize,
            None => {
                nodes.push(TrieNode::default());
                let child = (nodes.len() - 1) as u32;
                nodes[node].children.insert(byte, child);
                child as usize
            }
        };
        node = next;
        nodes[node].subtree_keys += 1;
    }
    nodes[node].terminal = true;
}
