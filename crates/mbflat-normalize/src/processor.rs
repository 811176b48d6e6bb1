//! The per-artist processing loop.
//!
//! Walks the artist offset index in sorted MBID order. For each artist:
//! skip if its document already exists (resume), apply the artist-type
//! filter, seek-read its release-groups (and optionally their releases),
//! normalize, write albums then the artist document atomically, and
//! stream album rows into the album search database. A failure affects
//! that artist only; the run fails only when the failed-artist count
//! exceeds the configured bound.

use std::path::PathBuf;

use mbflat_formats::{
    AlbumSummary, ArtistDocument, ArtistRecord, BuildFlags, ReleaseGroupRecord, ReleaseRecord,
    SourceManifest,
};
use mbflat_index::{IndexPaths, LineReader, LoadedIndexes, load_indexes};
use mbflat_search::{ALBUM_DB, AlbumFtsWriter};
use mbflat_store::{DocumentKind, DocumentStore, PathMapping};
use tracing::{debug, info, warn};

use crate::error::{NormalizeError, Result};
use crate::normalize::{NormalizedAlbum, normalize_album, normalize_artist};

/// Manifest file name for the processing stage.
const PROCESS_MANIFEST: &str = "process.manifest.json";

/// Configuration for one processing run.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Filtered artist NDJSON.
    pub artist_file: PathBuf,
    /// Filtered release-group NDJSON.
    pub release_group_file: PathBuf,
    /// Filtered release NDJSON, when full release data is enabled.
    pub release_file: Option<PathBuf>,
    /// Directory holding the offset and join indexes.
    pub index_dir: PathBuf,
    /// Output root for the sharded trees, mapping, and album database.
    pub output_dir: PathBuf,
    /// Build feature flags.
    pub flags: BuildFlags,
    /// Optional cap on processed artists, for development runs.
    pub max_artists: Option<usize>,
    /// Maximum tolerated failed artists before the run itself fails.
    pub max_failed_artists: Option<u64>,
}

/// Counters for one processing run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessOutcome {
    /// Artists normalized and written during this run.
    pub processed: u64,
    /// Artists skipped because their document already existed.
    pub skipped_existing: u64,
    /// Artists excluded by the type filter.
    pub skipped_filtered: u64,
    /// Artists that failed and were logged.
    pub failed: u64,
    /// Album documents written during this run.
    pub albums_written: u64,
}

/// Run the per-artist processing stage.
pub fn run_process(config: &ProcessConfig) -> Result<ProcessOutcome> {
    let manifest_path = config.output_dir.join(PROCESS_MANIFEST);
    let sources = manifest_sources(config);
    let manifest_flags = config.flags.as_manifest_flags();
    if SourceManifest::load(&manifest_path)
        .is_some_and(|m| m.is_current(&sources, &manifest_flags))
    {
        info!("Processed dataset is up to date, skipping processing stage");
        return Ok(ProcessOutcome::default());
    }

    let load_releases = config.flags.use_full_release_data && config.release_file.is_some();
    let indexes = load_indexes(&IndexPaths::new(&config.index_dir), load_releases)?;

    let store = DocumentStore::new(&config.output_dir);
    let album_fts = AlbumFtsWriter::create(&config.output_dir.join(ALBUM_DB))?;
    let mut mapping = PathMapping::new();

    let mut artist_reader = LineReader::open(&config.artist_file)?;
    let mut rg_reader = LineReader::open(&config.release_group_file)?;
    let mut release_reader = match (&config.release_file, load_releases) {
        (Some(path), true) => Some(LineReader::open(path)?),
        _ => None,
    };

    let artist_ids = indexes.artist_offsets.sorted_ids();
    let total = config
        .max_artists
        .map_or(artist_ids.len(), |limit| artist_ids.len().min(limit));
    info!("Processing {total} artists");

    let mut outcome = ProcessOutcome::default();
    let mut visited = 0usize;

    for artist_id in &artist_ids {
        if config.max_artists.is_some_and(|limit| visited >= limit) {
            info!("Reached processing limit of {visited} artists, stopping");
            break;
        }
        visited += 1;

        if store.exists(DocumentKind::Artist, artist_id) {
            debug!("Artist {artist_id} already processed, skipping");
            // The album database is rebuilt each run; rows for already
            // written artists are restored from their documents so a
            // resumed run still ends with a complete index.
            match reinsert_existing(&store, &album_fts, &mut mapping, artist_id) {
                Ok(albums) => outcome.albums_written += albums,
                Err(err) => warn!("Could not restore album rows for {artist_id}: {err}"),
            }
            outcome.skipped_existing += 1;
            continue;
        }

        match process_artist(
            artist_id,
            config,
            &indexes,
            &store,
            &album_fts,
            &mut mapping,
            &mut artist_reader,
            &mut rg_reader,
            release_reader.as_mut(),
        ) {
            Ok(ArtistOutcome::Written { albums }) => {
                outcome.processed += 1;
                outcome.albums_written += albums;
                if outcome.processed % 10_000 == 0 {
                    info!("Processed {}/{total} artists...", outcome.processed);
                }
            }
            Ok(ArtistOutcome::Filtered) => outcome.skipped_filtered += 1,
            Err(err) => {
                warn!("Failed to process artist {artist_id}: {err}");
                outcome.failed += 1;
            }
        }
    }

    album_fts.finalize()?;
    mapping.save(&config.output_dir)?;

    if let Some(bound) = config.max_failed_artists
        && outcome.failed > bound
    {
        return Err(NormalizeError::TooManyFailures {
            failed: outcome.failed,
            bound,
        });
    }

    // Written last: every document, the mapping, and the album database
    // are durable before the stage declares itself current.
    SourceManifest::capture(&sources, manifest_flags).store(&manifest_path)?;

    info!(
        "Processing complete: {} written, {} resumed, {} filtered, {} failed, {} albums",
        outcome.processed,
        outcome.skipped_existing,
        outcome.skipped_filtered,
        outcome.failed,
        outcome.albums_written
    );
    Ok(outcome)
}

enum ArtistOutcome {
    Written { albums: u64 },
    Filtered,
}

#[allow(clippy::too_many_arguments)]
fn process_artist(
    artist_id: &str,
    config: &ProcessConfig,
    indexes: &LoadedIndexes,
    store: &DocumentStore,
    album_fts: &AlbumFtsWriter,
    mapping: &mut PathMapping,
    artist_reader: &mut LineReader,
    rg_reader: &mut LineReader,
    mut release_reader: Option<&mut LineReader>,
) -> Result<ArtistOutcome> {
    let Some(artist_offset) = indexes.artist_offsets.lookup(artist_id) else {
        // Enumeration comes from this index, so this cannot happen; treat
        // it as a per-artist failure rather than trusting the impossible.
        return Err(NormalizeError::Io(std::io::Error::other(format!(
            "artist {artist_id} missing from offset index"
        ))));
    };
    let artist: ArtistRecord = serde_json::from_str(&artist_reader.line_at(artist_offset)?)?;

    if !config.flags.includes_artist(&artist) {
        debug!("Artist {artist_id} excluded by type filter");
        return Ok(ArtistOutcome::Filtered);
    }

    let mut albums: Vec<NormalizedAlbum> = Vec::new();
    for rg_id in indexes.artist_rgs.get(artist_id) {
        let Some(rg_offset) = indexes.rg_offsets.lookup(rg_id) else {
            continue;
        };
        let rg: ReleaseGroupRecord = match serde_json::from_str(&rg_reader.line_at(rg_offset)?) {
            Ok(rg) => rg,
            Err(err) => {
                warn!("Could not parse release-group {rg_id}: {err}");
                continue;
            }
        };
        if !config.flags.includes_release_group(&rg) {
            continue;
        }

        let releases = load_releases(&rg.id, indexes, release_reader.as_deref_mut())?;
        albums.push(normalize_album(&rg, &artist, &releases));
    }

    // Albums first, the artist document last: its rename is the commit
    // point the resume check relies on.
    let mut summaries: Vec<AlbumSummary> = Vec::with_capacity(albums.len());
    let album_count = albums.len() as u64;
    for album in &albums {
        store.write(DocumentKind::Album, &album.document.id, &album.document)?;
        album_fts.insert(&album.document)?;
        mapping.add_album(&album.document.id);
        summaries.push(album.summary());
    }

    let document = normalize_artist(&artist, summaries);
    store.write(DocumentKind::Artist, artist_id, &document)?;
    mapping.add_artist(artist_id);

    Ok(ArtistOutcome::Written {
        albums: album_count,
    })
}

fn load_releases(
    rg_id: &str,
    indexes: &LoadedIndexes,
    release_reader: Option<&mut LineReader>,
) -> Result<Vec<ReleaseRecord>> {
    let (Some(release_indexes), Some(reader)) = (&indexes.release, release_reader) else {
        return Ok(Vec::new());
    };

    let mut releases = Vec::new();
    for release_id in release_indexes.rg_releases.get(rg_id) {
        let Some(offset) = release_indexes.offsets.lookup(release_id) else {
            continue;
        };
        match serde_json::from_str::<ReleaseRecord>(&reader.line_at(offset)?) {
            Ok(release) => releases.push(release),
            Err(err) => warn!("Could not parse release {release_id} for {rg_id}: {err}"),
        }
    }
    Ok(releases)
}

/// Restore album search rows and mapping entries for an artist written by
/// a previous interrupted run.
fn reinsert_existing(
    store: &DocumentStore,
    album_fts: &AlbumFtsWriter,
    mapping: &mut PathMapping,
    artist_id: &str,
) -> Result<u64> {
    let document: ArtistDocument = store.read(DocumentKind::Artist, artist_id)?;
    mapping.add_artist(artist_id);

    let mut restored = 0u64;
    for summary in &document.albums {
        match store.read(DocumentKind::Album, &summary.id) {
            Ok(album) => {
                album_fts.insert(&album)?;
                mapping.add_album(&summary.id);
                restored += 1;
            }
            Err(err) => warn!("Album {} missing for artist {artist_id}: {err}", summary.id),
        }
    }
    Ok(restored)
}

fn manifest_sources(config: &ProcessConfig) -> Vec<PathBuf> {
    let mut sources = vec![
        config.artist_file.clone(),
        config.release_group_file.clone(),
    ];
    if let Some(release_file) = &config.release_file {
        sources.push(release_file.clone());
    }
    sources
}

/// Convenience: does the output root already hold a current dataset?
pub fn is_current(config: &ProcessConfig) -> bool {
    SourceManifest::load(&config.output_dir.join(PROCESS_MANIFEST))
        .is_some_and(|m| m.is_current(&manifest_sources(config), &config.flags.as_manifest_flags()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use mbflat_index::run_index;
    use serde_json::Value;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: ProcessConfig,
    }

    /// Two artists; a1 has two release-groups (one excluded by secondary
    /// type under strict flags), a2 has one. One release exists for g1.
    fn fixture(flags: BuildFlags) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("processed");
        fs::create_dir_all(&processed).unwrap();

        let artist_file = processed.join("artist.filtered");
        fs::write(
            &artist_file,
            concat!(
                "{\"id\":\"aaaa1111-0000-0000-0000-000000000001\",\"name\":\"Alpha\",\"sort-name\":\"Alpha\",\"type\":\"Group\",\"life-span\":{\"ended\":false}}\n",
                "{\"id\":\"bbbb2222-0000-0000-0000-000000000002\",\"name\":\"Beta\",\"sort-name\":\"Beta\",\"type\":\"Person\",\"life-span\":{\"ended\":true}}\n",
            ),
        )
        .unwrap();

        let rg_file = processed.join("release-group.filtered");
        fs::write(
            &rg_file,
            concat!(
                "{\"id\":\"g1111111-0000-0000-0000-000000000001\",\"title\":\"Zenith\",\"primary-type\":\"Album\",\"first-release-date\":\"1997\",\"artist-credit\":[{\"artist\":{\"id\":\"aaaa1111-0000-0000-0000-000000000001\",\"name\":\"Alpha\"}}]}\n",
                "{\"id\":\"g2222222-0000-0000-0000-000000000002\",\"title\":\"Apex\",\"primary-type\":\"Album\",\"secondary-types\":[\"Live\"],\"artist-credit\":[{\"artist\":{\"id\":\"aaaa1111-0000-0000-0000-000000000001\",\"name\":\"Alpha\"}}]}\n",
                "{\"id\":\"g3333333-0000-0000-0000-000000000003\",\"title\":\"Nadir\",\"primary-type\":\"Album\",\"artist-credit\":[{\"artist\":{\"id\":\"bbbb2222-0000-0000-0000-000000000002\",\"name\":\"Beta\"}}]}\n",
            ),
        )
        .unwrap();

        let release_file = processed.join("release.filtered");
        fs::write(
            &release_file,
            concat!(
                "{\"id\":\"r1111111-0000-0000-0000-000000000001\",\"title\":\"Zenith\",\"status\":\"Official\",\"date\":\"1997-05-21\",\"country\":[\"GB\"],\"release_group_id\":\"g1111111-0000-0000-0000-000000000001\",\"labels\":[\"XL\"],\"media\":[{\"position\":1,\"format\":\"CD\",\"track_count\":1,\"tracks\":[{\"id\":\"t1\",\"title\":\"One\",\"number\":\"1\",\"position\":1,\"length\":200,\"artist_id\":null,\"recording_id\":\"rec1\",\"medium_position\":1}]}]}\n",
            ),
        )
        .unwrap();

        let index_dir = processed.join("indexes");
        run_index(
            &artist_file,
            &rg_file,
            Some(release_file.as_path()),
            &IndexPaths::new(&index_dir),
            &flags,
        )
        .unwrap();

        let config = ProcessConfig {
            artist_file,
            release_group_file: rg_file,
            release_file: flags.use_full_release_data.then_some(release_file),
            index_dir,
            output_dir: processed,
            flags,
            max_artists: None,
            max_failed_artists: None,
        };
        Fixture { _dir: dir, config }
    }

    fn read_doc(config: &ProcessConfig, kind: DocumentKind, mbid: &str) -> Value {
        DocumentStore::new(&config.output_dir)
            .read_value(kind, mbid)
            .unwrap()
    }

    #[test]
    fn full_run_writes_artists_albums_and_mapping() {
        let flags = BuildFlags {
            use_full_release_data: true,
            include_release_types: Some(vec!["Album".to_string()]),
            exclude_secondary_types: vec!["Live".to_string()],
            ..BuildFlags::default()
        };
        let fixture = fixture(flags);
        let outcome = run_process(&fixture.config).unwrap();

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.albums_written, 2, "the Live release-group is excluded");
        assert_eq!(outcome.failed, 0);

        // Artist document: one album summary, real release statuses.
        let alpha = read_doc(
            &fixture.config,
            DocumentKind::Artist,
            "aaaa1111-0000-0000-0000-000000000001",
        );
        let albums = alpha["Albums"].as_array().unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0]["Title"], "Zenith");
        assert_eq!(albums[0]["ReleaseStatuses"][0], "Official");

        // Album document: real release with tracks from the release dump.
        let zenith = read_doc(
            &fixture.config,
            DocumentKind::Album,
            "g1111111-0000-0000-0000-000000000001",
        );
        assert_eq!(zenith["releasedate"], "1997-01-01");
        let release = &zenith["releases"][0];
        assert_eq!(release["id"], "r1111111-0000-0000-0000-000000000001");
        assert_eq!(release["label"][0], "XL");
        assert_eq!(release["tracks"][0]["recordingid"], "rec1");
        assert_eq!(
            release["tracks"][0]["artistid"], "aaaa1111-0000-0000-0000-000000000001",
            "null track artist falls back to the album artist"
        );

        // Path mapping covers both kinds.
        let mapping: Value = serde_json::from_slice(
            &fs::read(fixture.config.output_dir.join("file_path_mapping.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(mapping["artists"].as_object().unwrap().len(), 2);
        assert_eq!(mapping["albums"].as_object().unwrap().len(), 2);

        // Album search database has one row per album.
        let conn = rusqlite::Connection::open(fixture.config.output_dir.join(ALBUM_DB)).unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM albums_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn without_release_data_albums_carry_placeholders() {
        let fixture = fixture(BuildFlags::default());
        run_process(&fixture.config).unwrap();

        let nadir = read_doc(
            &fixture.config,
            DocumentKind::Album,
            "g3333333-0000-0000-0000-000000000003",
        );
        let releases = nadir["releases"].as_array().unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0]["id"], "g3333333-0000-0000-0000-000000000003");
        assert_eq!(releases[0]["media"].as_array().unwrap().len(), 1);
        assert_eq!(releases[0]["tracks"][0]["trackname"], "Track 1");

        let beta = read_doc(
            &fixture.config,
            DocumentKind::Artist,
            "bbbb2222-0000-0000-0000-000000000002",
        );
        assert_eq!(beta["Albums"][0]["ReleaseStatuses"][0], "Official");
        assert_eq!(beta["status"], "ended");
    }

    #[test]
    fn second_run_is_a_no_op_and_resume_rewrites_missing_artists() {
        let fixture = fixture(BuildFlags::default());
        run_process(&fixture.config).unwrap();

        let alpha_path = DocumentStore::new(&fixture.config.output_dir).document_path(
            DocumentKind::Artist,
            "aaaa1111-0000-0000-0000-000000000001",
        );
        let mtime = fs::metadata(&alpha_path).unwrap().modified().unwrap();

        // Unchanged inputs: the stage skips entirely, touching nothing.
        let outcome = run_process(&fixture.config).unwrap();
        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.skipped_existing, 0);
        assert_eq!(fs::metadata(&alpha_path).unwrap().modified().unwrap(), mtime);

        // Simulate a crash: drop the manifest and one artist document.
        fs::remove_file(fixture.config.output_dir.join(PROCESS_MANIFEST)).unwrap();
        fs::remove_file(&alpha_path).unwrap();

        let outcome = run_process(&fixture.config).unwrap();
        assert_eq!(outcome.processed, 1, "only the missing artist is redone");
        assert_eq!(outcome.skipped_existing, 1);
        assert!(alpha_path.exists());

        // The rebuilt album database still covers every album: two from
        // the reprocessed artist, one restored from the resumed one.
        let conn = rusqlite::Connection::open(fixture.config.output_dir.join(ALBUM_DB)).unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM albums_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[test]
    fn artist_type_filter_skips_without_writing() {
        let flags = BuildFlags {
            include_artist_types: Some(vec!["Person".to_string()]),
            ..BuildFlags::default()
        };
        let fixture = fixture(flags);
        let outcome = run_process(&fixture.config).unwrap();

        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped_filtered, 1);
        let store = DocumentStore::new(&fixture.config.output_dir);
        assert!(!store.exists(
            DocumentKind::Artist,
            "aaaa1111-0000-0000-0000-000000000001"
        ));
        assert!(store.exists(
            DocumentKind::Artist,
            "bbbb2222-0000-0000-0000-000000000002"
        ));
    }

    #[test]
    fn max_artists_caps_the_run() {
        let mut fixture = fixture(BuildFlags::default());
        fixture.config.max_artists = Some(1);
        let outcome = run_process(&fixture.config).unwrap();
        assert_eq!(outcome.processed, 1);
    }
}
