//! Upstream → downstream MBID join indexes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mbflat_formats::fsutil::write_atomic;

use crate::error::{IndexError, Result};

/// A map from an upstream MBID to the downstream MBIDs encountered under
/// it, in file order.
///
/// Value order is the order records appeared in the source file; it is
/// stable across reruns over identical inputs. Duplicates are kept only if
/// the source contains duplicates — no deduplication is performed.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex {
    entries: HashMap<String, Vec<String>>,
}

impl JoinIndex {
    /// Create an empty join index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a downstream MBID under an upstream key.
    pub fn append(&mut self, upstream: String, downstream: String) {
        self.entries.entry(upstream).or_default().push(downstream);
    }

    /// Downstream MBIDs for `upstream`, empty when none were indexed.
    pub fn get(&self, upstream: &str) -> &[String] {
        self.entries.get(upstream).map_or(&[], Vec::as_slice)
    }

    /// Number of upstream keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomically persist the index as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec(&self.entries)?;
        write_atomic(path, &contents)?;
        Ok(())
    }

    /// Load an index previously written by [`JoinIndex::save`].
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
