//! Document placement and retrieval.

use std::fs;
use std::path::{Path, PathBuf};

use mbflat_formats::fsutil::write_atomic;
use mbflat_formats::shard::shard_path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::error::{Result, StoreError};

/// The two document trees managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Normalized artist documents.
    Artist,
    /// Normalized album documents.
    Album,
}

impl DocumentKind {
    /// Directory name of the document tree.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
        }
    }
}

/// A sharded document store rooted at an output directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `root`. The root is created lazily on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sharded path of a document.
    pub fn document_path(&self, kind: DocumentKind, mbid: &str) -> PathBuf {
        shard_path(&self.root, kind.as_str(), mbid)
    }

    /// Whether a document exists. This is the per-artist resume check.
    pub fn exists(&self, kind: DocumentKind, mbid: &str) -> bool {
        self.document_path(kind, mbid).exists()
    }

    /// Atomically write a document.
    ///
    /// A failed atomic replacement is retried once with a fresh temporary
    /// name before the error surfaces to the caller.
    pub fn write(&self, kind: DocumentKind, mbid: &str, document: &impl Serialize) -> Result<()> {
        let path = self.document_path(kind, mbid);
        let contents = serde_json::to_vec(document)?;
        trace!("Writing {} document {mbid}", kind.as_str());

        if let Err(first) = write_atomic(&path, &contents) {
            warn!(
                "Atomic write of {} failed ({first}), retrying once",
                path.display()
            );
            write_atomic(&path, &contents)?;
        }
        Ok(())
    }

    /// Read and decode a document.
    pub fn read<T: DeserializeOwned>(&self, kind: DocumentKind, mbid: &str) -> Result<T> {
        let path = self.document_path(kind, mbid);
        let contents = fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    kind: kind.as_str(),
                    mbid: mbid.to_string(),
                }
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Read a document as a raw JSON value, as served over HTTP.
    pub fn read_value(&self, kind: DocumentKind, mbid: &str) -> Result<serde_json::Value> {
        self.read(kind, mbid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_land_in_sharded_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let mbid = "a74b1b7f-71a5-4011-9441-d0b5e4122711";

        store
            .write(DocumentKind::Artist, mbid, &json!({"id": mbid}))
            .unwrap();

        let expected = dir.path().join(format!("artist/a7/4b/{mbid}.json"));
        assert!(expected.exists());
        assert!(store.exists(DocumentKind::Artist, mbid));
        assert!(!store.exists(DocumentKind::Album, mbid));

        let value = store.read_value(DocumentKind::Artist, mbid).unwrap();
        assert_eq!(value["id"], mbid);
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let err = store.read_value(DocumentKind::Album, "ffffffff-0000-0000-0000-000000000000");
        assert!(matches!(err, Err(StoreError::NotFound { kind: "album", .. })));
    }

    #[test]
    fn rewrite_replaces_document_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let mbid = "00000000-0000-0000-0000-000000000001";

        store
            .write(DocumentKind::Album, mbid, &json!({"title": "first"}))
            .unwrap();
        store
            .write(DocumentKind::Album, mbid, &json!({"title": "second"}))
            .unwrap();

        let value = store.read_value(DocumentKind::Album, mbid).unwrap();
        assert_eq!(value["title"], "second");
    }
}
