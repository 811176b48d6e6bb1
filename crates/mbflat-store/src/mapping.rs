//! MBID → path manifest.
//!
//! Consumers may either look paths up here or recompute them from the
//! shard rule; the two are always equivalent. The mapping is accumulated
//! incrementally during processing and written once at the end of the run.

use std::collections::BTreeMap;
use std::path::Path;

use mbflat_formats::fsutil::write_atomic;
use mbflat_formats::shard::shard_rel_path;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the mapping at the output root.
pub const MAPPING_FILE: &str = "file_path_mapping.json";

/// Relative document paths keyed by MBID, per document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMapping {
    /// Artist MBID → relative path.
    pub artists: BTreeMap<String, String>,
    /// Album MBID → relative path.
    pub albums: BTreeMap<String, String>,
    /// Shard fan-out depth, for consumers that recompute paths.
    pub subdirectory_depth: u8,
}

impl Default for PathMapping {
    fn default() -> Self {
        Self {
            artists: BTreeMap::new(),
            albums: BTreeMap::new(),
            subdirectory_depth: 2,
        }
    }
}

impl PathMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an artist document.
    pub fn add_artist(&mut self, mbid: &str) {
        self.artists.insert(
            mbid.to_string(),
            shard_rel_path("artist", mbid).to_string_lossy().into_owned(),
        );
    }

    /// Record an album document.
    pub fn add_album(&mut self, mbid: &str) {
        self.albums.insert(
            mbid.to_string(),
            shard_rel_path("album", mbid).to_string_lossy().into_owned(),
        );
    }

    /// Atomically persist the mapping at the output root.
    pub fn save(&self, output_root: &Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        write_atomic(&output_root.join(MAPPING_FILE), &contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_matches_shard_rule() {
        let mut mapping = PathMapping::new();
        mapping.add_artist("a74b1b7f-71a5-4011-9441-d0b5e4122711");
        mapping.add_album("0b9fa944-0000-0000-0000-000000000000");

        assert_eq!(
            mapping.artists["a74b1b7f-71a5-4011-9441-d0b5e4122711"],
            "artist/a7/4b/a74b1b7f-71a5-4011-9441-d0b5e4122711.json"
        );
        assert_eq!(
            mapping.albums["0b9fa944-0000-0000-0000-000000000000"],
            "album/0b/9f/0b9fa944-0000-0000-0000-000000000000.json"
        );
        assert_eq!(mapping.subdirectory_depth, 2);
    }

    #[test]
    fn saves_at_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut mapping = PathMapping::new();
        mapping.add_artist("00000000-0000-0000-0000-000000000001");
        mapping.save(dir.path()).unwrap();

        let loaded: PathMapping = serde_json::from_slice(
            &std::fs::read(dir.path().join(MAPPING_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(loaded.artists.len(), 1);
    }
}
