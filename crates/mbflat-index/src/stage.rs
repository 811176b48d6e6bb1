//! Index stage driver.
//!
//! Wraps the building passes with source-manifest idempotency and the
//! on-disk layout consumed by the per-artist processor. Core indexes
//! (artist + release-group) and release indexes carry separate manifests
//! so a release-dump refresh does not force a core rebuild.

use std::path::{Path, PathBuf};

use mbflat_formats::{BuildFlags, SourceManifest};
use tracing::info;

use crate::builder::{build_artist_offsets, build_release_group_indexes, build_release_indexes};
use crate::error::Result;
use crate::join::JoinIndex;
use crate::offset::OffsetIndex;

/// On-disk layout of the index directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    dir: PathBuf,
}

impl IndexPaths {
    /// Layout rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The index directory itself.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artist MBID → byte offset.
    pub fn artist_offsets(&self) -> PathBuf {
        self.dir.join("artist_to_byte_offset.json")
    }

    /// Release-group MBID → byte offset.
    pub fn rg_offsets(&self) -> PathBuf {
        self.dir.join("rg_to_byte_offset.json")
    }

    /// Artist MBID → release-group MBIDs.
    pub fn artist_rgs(&self) -> PathBuf {
        self.dir.join("artist_to_rg_ids.json")
    }

    /// Release MBID → byte offset.
    pub fn release_offsets(&self) -> PathBuf {
        self.dir.join("release_to_byte_offset.json")
    }

    /// Release-group MBID → release MBIDs.
    pub fn rg_releases(&self) -> PathBuf {
        self.dir.join("rg_to_release_ids.json")
    }

    fn core_manifest(&self) -> PathBuf {
        self.dir.join("index.manifest.json")
    }

    fn release_manifest(&self) -> PathBuf {
        self.dir.join("release-index.manifest.json")
    }
}

/// Build all indexes for the given filtered files.
///
/// Core indexes rebuild when the artist or release-group file (or the
/// filter flags affecting the join) changed; release indexes rebuild when
/// the release file changed, and only when full release data is enabled.
pub fn run_index(
    artist_file: &Path,
    rg_file: &Path,
    release_file: Option<&Path>,
    paths: &IndexPaths,
    flags: &BuildFlags,
) -> Result<()> {
    let manifest_flags = flags.as_manifest_flags();

    let core_sources = vec![artist_file.to_path_buf(), rg_file.to_path_buf()];
    let core_current = SourceManifest::load(&paths.core_manifest())
        .is_some_and(|m| m.is_current(&core_sources, &manifest_flags))
        && paths.artist_offsets().exists()
        && paths.rg_offsets().exists()
        && paths.artist_rgs().exists();

    if core_current {
        info!("Core indexes are up to date, skipping rebuild");
    } else {
        let artist_offsets = build_artist_offsets(artist_file)?;
        let (rg_offsets, artist_rgs) = build_release_group_indexes(rg_file, flags)?;

        artist_offsets.save(&paths.artist_offsets())?;
        rg_offsets.save(&paths.rg_offsets())?;
        artist_rgs.save(&paths.artist_rgs())?;
        SourceManifest::capture(&core_sources, manifest_flags.clone())
            .store(&paths.core_manifest())?;
        info!("Core indexes built");
    }

    if !flags.use_full_release_data {
        info!("Full release data disabled, skipping release indexes");
        return Ok(());
    }
    let Some(release_file) = release_file else {
        info!("No release file available, skipping release indexes");
        return Ok(());
    };

    let release_sources = vec![release_file.to_path_buf()];
    let release_current = SourceManifest::load(&paths.release_manifest())
        .is_some_and(|m| m.is_current(&release_sources, &manifest_flags))
        && paths.release_offsets().exists()
        && paths.rg_releases().exists();

    if release_current {
        info!("Release indexes are up to date, skipping rebuild");
    } else {
        let (release_offsets, rg_releases) = build_release_indexes(release_file)?;
        release_offsets.save(&paths.release_offsets())?;
        rg_releases.save(&paths.rg_releases())?;
        SourceManifest::capture(&release_sources, manifest_flags)
            .store(&paths.release_manifest())?;
        info!("Release indexes built");
    }

    Ok(())
}

/// All indexes loaded into memory for the per-artist processor.
#[derive(Debug)]
pub struct LoadedIndexes {
    /// Artist MBID → byte offset.
    pub artist_offsets: OffsetIndex,
    /// Release-group MBID → byte offset.
    pub rg_offsets: OffsetIndex,
    /// Artist MBID → release-group MBIDs.
    pub artist_rgs: JoinIndex,
    /// Release indexes, present when full release data is enabled.
    pub release: Option<ReleaseIndexes>,
}

/// The release-side indexes.
#[derive(Debug)]
pub struct ReleaseIndexes {
    /// Release MBID → byte offset.
    pub offsets: OffsetIndex,
    /// Release-group MBID → release MBIDs.
    pub rg_releases: JoinIndex,
}

/// Load the indexes produced by [`run_index`].
pub fn load_indexes(paths: &IndexPaths, use_full_release_data: bool) -> Result<LoadedIndexes> {
    let artist_offsets = OffsetIndex::load(&paths.artist_offsets())?;
    let rg_offsets = OffsetIndex::load(&paths.rg_offsets())?;
    let artist_rgs = JoinIndex::load(&paths.artist_rgs())?;

    let release = if use_full_release_data {
        Some(ReleaseIndexes {
            offsets: OffsetIndex::load(&paths.release_offsets())?,
            rg_releases: JoinIndex::load(&paths.rg_releases())?,
        })
    } else {
        None
    };

    info!(
        "Loaded indexes: {} artists, {} release-groups{}",
        artist_offsets.len(),
        rg_offsets.len(),
        release
            .as_ref()
            .map(|r| format!(", {} releases", r.offsets.len()))
            .unwrap_or_default()
    );

    Ok(LoadedIndexes {
        artist_offsets,
        rg_offsets,
        artist_rgs,
        release,
    })
}
