//! Per-stage source manifests.
//!
//! Each pipeline stage records the inputs that produced its current
//! outputs: absolute paths, modification timestamps, and the feature flags
//! that shaped the run. A stage rebuilds whenever any of these differs
//! from the current inputs, and otherwise skips its work entirely. The
//! manifest is written last, after every other stage output is durable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::fsutil::write_atomic;

/// Inputs consumed by the stage that owns this manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    /// Absolute paths of the consumed inputs, in stage order.
    pub source_paths: Vec<PathBuf>,
    /// Modification timestamps (seconds since epoch) matching
    /// `source_paths` by index; zero for paths that did not exist.
    pub source_mtimes: Vec<u64>,
    /// Stage-relevant feature flags, as stable key/value pairs.
    #[serde(default)]
    pub feature_flags: BTreeMap<String, String>,
    /// Completion time of the producing run (seconds since epoch).
    pub completed_at: u64,
}

impl SourceManifest {
    /// Capture a manifest describing the given inputs as they are now.
    pub fn capture(paths: &[PathBuf], feature_flags: BTreeMap<String, String>) -> Self {
        let source_mtimes = paths.iter().map(|p| mtime_secs(p)).collect();
        Self {
            source_paths: paths.to_vec(),
            source_mtimes,
            feature_flags,
            completed_at: now_secs(),
        }
    }

    /// Whether this manifest still describes the given inputs.
    ///
    /// Paths, their modification timestamps, and the feature flags must
    /// all match; any difference means the owning stage must rebuild.
    pub fn is_current(&self, paths: &[PathBuf], feature_flags: &BTreeMap<String, String>) -> bool {
        if self.source_paths != paths || &self.feature_flags != feature_flags {
            return false;
        }
        self.source_mtimes
            .iter()
            .zip(paths)
            .all(|(recorded, path)| *recorded == mtime_secs(path))
    }

    /// Load a manifest, returning `None` when it is absent or unreadable.
    ///
    /// An unreadable manifest is treated as missing so the owning stage
    /// rebuilds instead of trusting stale outputs.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = fs::read(path).ok()?;
        match serde_json::from_slice(&contents) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!("Ignoring unreadable manifest {}: {err}", path.display());
                None
            }
        }
    }

    /// Atomically persist the manifest.
    pub fn store(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &contents)
    }
}

fn mtime_secs(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn manifest_round_trips_and_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("artist.filtered");
        fs::File::create(&input)
            .unwrap()
            .write_all(b"{}\n")
            .unwrap();

        let mut flags = BTreeMap::new();
        flags.insert("use_full_release_data".to_string(), "false".to_string());

        let paths = vec![input.clone()];
        let manifest = SourceManifest::capture(&paths, flags.clone());
        let manifest_path = dir.path().join("stage.manifest.json");
        manifest.store(&manifest_path).unwrap();

        let loaded = SourceManifest::load(&manifest_path).unwrap();
        assert_eq!(loaded, manifest);
        assert!(loaded.is_current(&paths, &flags));

        // A flag change forces a rebuild.
        let mut changed = flags.clone();
        changed.insert("use_full_release_data".to_string(), "true".to_string());
        assert!(!loaded.is_current(&paths, &changed));

        // A different input set forces a rebuild.
        assert!(!loaded.is_current(&[dir.path().join("other")], &flags));
    }

    #[test]
    fn missing_manifest_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceManifest::load(&dir.path().join("absent.json")).is_none());
    }
}
