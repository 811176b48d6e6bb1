//! Build feature flags.
//!
//! The flags shape which entities the pipeline keeps and how deep the
//! album documents go. They are persisted into every stage manifest so a
//! flag change invalidates exactly the stages it affects.

use std::collections::BTreeMap;

use crate::records::{ArtistRecord, ReleaseGroupRecord};

/// Feature flags governing a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    /// Load per-release data and emit full track lists. When disabled,
    /// albums carry a single placeholder release.
    pub use_full_release_data: bool,
    /// Primary types to keep; `None` keeps all.
    pub include_release_types: Option<Vec<String>>,
    /// Secondary types that exclude a release-group.
    pub exclude_secondary_types: Vec<String>,
    /// Artist types to keep; `None` keeps all.
    pub include_artist_types: Option<Vec<String>>,
}

impl BuildFlags {
    /// Whether a release-group passes the primary/secondary type filters.
    pub fn includes_release_group(&self, rg: &ReleaseGroupRecord) -> bool {
        if let Some(included) = &self.include_release_types {
            match &rg.primary_type {
                Some(primary) if included.iter().any(|t| t == primary) => {}
                _ => return false,
            }
        }
        !rg.secondary_types
            .iter()
            .any(|s| self.exclude_secondary_types.iter().any(|e| e == s))
    }

    /// Whether an artist passes the type filter.
    pub fn includes_artist(&self, artist: &ArtistRecord) -> bool {
        let Some(included) = &self.include_artist_types else {
            return true;
        };
        match &artist.artist_type {
            Some(kind) => included.iter().any(|t| t == kind),
            None => false,
        }
    }

    /// Stable key/value form for source manifests.
    pub fn as_manifest_flags(&self) -> BTreeMap<String, String> {
        let mut flags = BTreeMap::new();
        flags.insert(
            "use_full_release_data".to_string(),
            self.use_full_release_data.to_string(),
        );
        flags.insert(
            "include_release_types".to_string(),
            self.include_release_types
                .as_ref()
                .map_or_else(|| "all".to_string(), |v| v.join(",")),
        );
        flags.insert(
            "exclude_secondary_types".to_string(),
            self.exclude_secondary_types.join(","),
        );
        flags.insert(
            "include_artist_types".to_string(),
            self.include_artist_types
                .as_ref()
                .map_or_else(|| "all".to_string(), |v| v.join(",")),
        );
        flags
    }
}
