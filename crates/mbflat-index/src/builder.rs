//! Index building passes.
//!
//! Each pass walks a filtered NDJSON file once, recording the byte offset
//! before every line read. Lines that fail to parse or carry no `id` are
//! skipped; join entries whose upstream reference is absent are silently
//! omitted, never an error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mbflat_formats::records::ReleaseGroupRef;
use mbflat_formats::{BuildFlags, ReleaseGroupRecord};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::join::JoinIndex;
use crate::offset::OffsetIndex;

const READ_BUFFER: usize = 1 << 20;
const LOG_INTERVAL: u64 = 500_000;

/// Build the artist MBID → byte-offset index.
pub fn build_artist_offsets(artist_file: &Path) -> Result<OffsetIndex> {
    info!("Building artist byte-offset index from {}", artist_file.display());

    #[derive(Deserialize)]
    struct IdLine {
        id: String,
    }

    let mut index = OffsetIndex::new();
    walk_lines(artist_file, |offset, line| {
        if let Ok(record) = serde_json::from_str::<IdLine>(line) {
            index.insert(record.id, offset);
        }
    })?;

    info!("Indexed {} artists", index.len());
    Ok(index)
}

/// Build both release-group indexes in a single pass: MBID → byte offset,
/// and artist → [release-group MBID].
///
/// The join index only receives release-groups that pass the configured
/// type filters, keyed by the first-position credited artist. Offsets are
/// recorded for every release-group regardless of filtering.
pub fn build_release_group_indexes(
    rg_file: &Path,
    flags: &BuildFlags,
) -> Result<(OffsetIndex, JoinIndex)> {
    info!(
        "Building release-group indexes from {}",
        rg_file.display()
    );

    let mut offsets = OffsetIndex::new();
    let mut artist_rgs = JoinIndex::new();

    walk_lines(rg_file, |offset, line| {
        let Ok(record) = serde_json::from_str::<ReleaseGroupRecord>(line) else {
            return;
        };
        if record.id.is_empty() {
            return;
        }
        offsets.insert(record.id.clone(), offset);

        let artist_id = record.credited_artist_id().map(ToString::to_string);
        if flags.includes_release_group(&record)
            && let Some(artist_id) = artist_id
        {
            artist_rgs.append(artist_id, record.id);
        }
    })?;

    info!(
        "Indexed {} release-groups for {} artists",
        offsets.len(),
        artist_rgs.len()
    );
    Ok((offsets, artist_rgs))
}

/// Build both release indexes in a single pass: MBID → byte offset, and
/// release-group → [release MBID].
///
/// The release-group reference is resolved tolerantly — the filter's flat
/// `release_group_id` first, the raw nested `release-group.id` second.
/// Records carrying neither shape are left out of the join index.
pub fn build_release_indexes(release_file: &Path) -> Result<(OffsetIndex, JoinIndex)> {
    info!("Building release indexes from {}", release_file.display());

    #[derive(Deserialize)]
    struct ReleaseKeyLine {
        id: String,
        release_group_id: Option<String>,
        #[serde(rename = "release-group")]
        release_group: Option<ReleaseGroupRef>,
    }

    let mut offsets = OffsetIndex::new();
    let mut rg_releases = JoinIndex::new();

    walk_lines(release_file, |offset, line| {
        let Ok(record) = serde_json::from_str::<ReleaseKeyLine>(line) else {
            return;
        };
        if record.id.is_empty() {
            return;
        }
        offsets.insert(record.id.clone(), offset);

        let rg_id = record
            .release_group_id
            .or_else(|| record.release_group.and_then(|rg| rg.id));
        if let Some(rg_id) = rg_id {
            rg_releases.append(rg_id, record.id);
        }
    })?;

    info!(
        "Indexed {} releases under {} release-groups",
        offsets.len(),
        rg_releases.len()
    );
    Ok((offsets, rg_releases))
}

/// Walk an NDJSON file, handing each line and its starting byte offset to
/// the callback.
fn walk_lines(path: &Path, mut visit: impl FnMut(u64, &str)) -> Result<()> {
    let mut reader = BufReader::with_capacity(READ_BUFFER, File::open(path)?);
    let mut offset = 0u64;
    let mut count = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        visit(offset, line.trim_end_matches(['\n', '\r']));
        offset += read as u64;
        count += 1;
        if count % LOG_INTERVAL == 0 {
            debug!("...indexed {count} lines of {}", path.display());
        }
    }
    Ok(())
}
