//! MBID-sharded output paths.
//!
//! Documents are placed under `<kind>/<xx>/<yy>/<mbid>.json`, where `xx`
//! and `yy` are the first two and next two characters of the MBID,
//! lower-cased. Two 256-way fan-out levels keep every directory well under
//! one percent of the corpus.

use std::path::{Path, PathBuf};

/// Relative sharded path for a document: `<kind>/<xx>/<yy>/<mbid>.json`.
///
/// MBIDs shorter than four characters (never produced by the dump, but
/// tolerated) fall back to an unsharded `<kind>/<mbid>.json`.
pub fn shard_rel_path(kind: &str, mbid: &str) -> PathBuf {
    let mbid = mbid.to_lowercase();
    if mbid.len() >= 4 {
        Path::new(kind)
            .join(&mbid[..2])
            .join(&mbid[2..4])
            .join(format!("{mbid}.json"))
    } else {
        Path::new(kind).join(format!("{mbid}.json"))
    }
}

/// Absolute sharded path under an output root.
pub fn shard_path(root: &Path, kind: &str, mbid: &str) -> PathBuf {
    root.join(shard_rel_path(kind, mbid))
}
