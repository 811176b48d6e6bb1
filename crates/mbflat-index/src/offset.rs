//! MBID → byte-offset index.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mbflat_formats::fsutil::write_atomic;

use crate::error::{IndexError, Result};

/// A map from MBID to the byte offset of its line in a filtered file.
///
/// Keys are unique; inserting an MBID twice keeps the last occurrence,
/// matching the documented duplicate-handling decision for dump files.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    entries: HashMap<String, u64>,
}

impl OffsetIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; the last occurrence of a duplicate MBID wins.
    pub fn insert(&mut self, mbid: String, offset: u64) {
        self.entries.insert(mbid, offset);
    }

    /// Byte offset for `mbid`, or `None` when not present.
    pub fn lookup(&self, mbid: &str) -> Option<u64> {
        self.entries.get(mbid).copied()
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all indexed MBIDs, in map order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All MBIDs, sorted. This is the deterministic enumeration order the
    /// per-artist processor walks.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Atomically persist the index as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec(&self.entries)?;
        write_atomic(path, &contents)?;
        Ok(())
    }

    /// Load an index previously written by [`OffsetIndex::save`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::IndexNotFound(path.to_path_buf()));
        }
        let contents = fs::read(path)?;
        let entries =
            serde_json::from_slice(&contents).map_err(|source| IndexError::InvalidIndex {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { entries })
    }
}
