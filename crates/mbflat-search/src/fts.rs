//! Search database building.
//!
//! The artist database is produced by a dedicated streaming pass over the
//! filtered artist file; the album database is streamed into by the
//! per-artist processor through [`AlbumFtsWriter`]. Both are built under
//! WAL for insert speed and finalized into a read-only friendly state:
//! FTS index optimized, WAL checkpointed and truncated, journal mode
//! switched to DELETE, and the file vacuumed. Readers open the result
//! read-only and never see companion write-ahead files.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use mbflat_formats::{AlbumDocument, SourceManifest};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::text::{fold, phonetic_codes};

/// File name of the artist search database.
pub const ARTIST_DB: &str = "artist.db";

/// File name of the album search database.
pub const ALBUM_DB: &str = "album.db";

/// Manifest file name for the FTS build stage.
const FTS_MANIFEST: &str = "fts.manifest.json";

/// Build the artist FTS database from the filtered artist file.
///
/// One row per artist whose `id` and `name` are both non-empty. Returns
/// the number of rows inserted. Any existing database is replaced.
pub fn build_artist_fts(artist_file: &Path, db_path: &Path) -> Result<u64> {
    info!(
        "Building artist search index {} from {}",
        db_path.display(),
        artist_file.display()
    );
    if db_path.exists() {
        fs::remove_file(db_path)?;
    }
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut conn = open_for_build(db_path)?;
    conn.execute(
        "CREATE VIRTUAL TABLE artists_fts USING fts5(
            id UNINDEXED,
            name,
            sort_name,
            folded_name,
            phonetic_primary,
            phonetic_secondary
        )",
        [],
    )?;

    #[derive(Deserialize)]
    struct ArtistNameLine {
        id: Option<String>,
        name: Option<String>,
        #[serde(rename = "sort-name")]
        sort_name: Option<String>,
    }

    let mut inserted = 0u64;
    {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO artists_fts
                    (id, name, sort_name, folded_name, phonetic_primary, phonetic_secondary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            let reader = BufReader::new(File::open(artist_file)?);
            for line in reader.lines() {
                let line = line?;
                let Ok(record) = serde_json::from_str::<ArtistNameLine>(&line) else {
                    continue;
                };
                let (Some(id), Some(name)) = (record.id, record.name) else {
                    continue;
                };
                if id.is_empty() || name.is_empty() {
                    continue;
                }

                let folded = fold(&name);
                let (primary, alternate) = phonetic_codes(&name);
                stmt.execute(rusqlite::params![
                    id,
                    name,
                    record.sort_name,
                    folded,
                    primary,
                    alternate
                ])?;
                inserted += 1;
                if inserted % 100_000 == 0 {
                    info!("...inserted {inserted} artist rows");
                }
            }
        }
        tx.commit()?;
    }

    finalize(&conn, "artists_fts")?;
    drop(conn);
    info!("Built artist search index with {inserted} rows");
    Ok(inserted)
}

/// Run the artist FTS build with source-manifest idempotency.
///
/// Skips entirely when the manifest still describes the current filtered
/// artist file and the database exists.
pub fn run_fts(artist_file: &Path, db_dir: &Path) -> Result<PathBuf> {
    let db_path = db_dir.join(ARTIST_DB);
    let manifest_path = db_dir.join(FTS_MANIFEST);
    let sources = vec![artist_file.to_path_buf()];
    let flags = BTreeMap::new();

    if db_path.exists()
        && SourceManifest::load(&manifest_path).is_some_and(|m| m.is_current(&sources, &flags))
    {
        info!("Artist search index is up to date, skipping rebuild");
        return Ok(db_path);
    }

    build_artist_fts(artist_file, &db_path)?;
    SourceManifest::capture(&sources, flags).store(&manifest_path)?;
    Ok(db_path)
}

/// Single-writer handle for the album search database.
///
/// The per-artist processor streams one row per normalized album through
/// this handle. The embedded index does not support concurrent writers,
/// so the connection sits behind a mutex; workers share one writer.
pub struct AlbumFtsWriter {
    conn: Mutex<Connection>,
}

impl AlbumFtsWriter {
    /// Create the album database, replacing any previous build.
    pub fn create(db_path: &Path) -> Result<Self> {
        if db_path.exists() {
            fs::remove_file(db_path)?;
        }
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = open_for_build(db_path)?;
        conn.execute(
            "CREATE VIRTUAL TABLE albums_fts USING fts5(
                id UNINDEXED,
                title,
                artist_id UNINDEXED,
                artist_name,
                folded_title,
                type UNINDEXED,
                release_date UNINDEXED
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one row for a normalized album.
    pub fn insert(&self, album: &AlbumDocument) -> Result<()> {
        let artist_name = album
            .artists
            .first()
            .and_then(|artist| artist.artistname.clone())
            .unwrap_or_default();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO albums_fts
                (id, title, artist_id, artist_name, folded_title, type, release_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                album.id,
                album.title,
                album.artistid,
                artist_name,
                fold(&album.title),
                album.album_type,
                album.releasedate
            ],
        )?;
        Ok(())
    }

    /// Optimize and compact the database, leaving it read-only friendly.
    pub fn finalize(self) -> Result<()> {
        let conn = self.conn.into_inner();
        finalize(&conn, "albums_fts")?;
        Ok(())
    }
}

impl std::fmt::Debug for AlbumFtsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumFtsWriter").finish_non_exhaustive()
    }
}

/// Open a database for bulk building: WAL journaling, no fsync per
/// insert, in-memory temp store.
fn open_for_build(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "OFF")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(conn)
}

/// Compact an FTS table and clear all write-ahead state.
fn finalize(conn: &Connection, table: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO {table}({table}) VALUES('optimize')"),
        [],
    )?;
    if let Err(err) = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
        warn!("WAL checkpoint failed: {err}");
    }
    conn.pragma_update(None, "journal_mode", "DELETE")?;
    conn.execute("VACUUM", [])?;
    Ok(())
}
