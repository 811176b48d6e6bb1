//! Stage drivers for extraction and filtering.
//!
//! Each driver decides rebuild-or-skip from a source manifest written at
//! the end of its last successful run, then performs the work through the
//! lower-level modules.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mbflat_formats::SourceManifest;
use tracing::info;

use crate::error::Result;
use crate::extract::extract_entity;
use crate::filter::{FilterStats, filter_artist, filter_release_archive, filter_release_group};

/// Manifest file name for the filter stage, kept at the output root.
const FILTER_MANIFEST: &str = "filter.manifest.json";

/// Extract the artist and release-group archives under `input_dir`.
///
/// The release archive is intentionally not extracted; the filter stage
/// streams it. Missing archives are fatal.
pub fn run_extract(input_dir: &Path) -> Result<()> {
    for entity in ["artist", "release-group"] {
        let archive = input_dir.join(format!("{entity}.tar.xz"));
        extract_entity(&archive, input_dir, entity)?;
    }
    Ok(())
}

/// Produced paths of a filter run.
#[derive(Debug)]
pub struct FilterOutputs {
    /// Filtered artist NDJSON.
    pub artist: PathBuf,
    /// Filtered release-group NDJSON.
    pub release_group: PathBuf,
    /// Filtered release NDJSON, when the release archive was available.
    pub release: Option<PathBuf>,
}

/// Run the schema filter over the extracted dumps.
///
/// Inputs are `<input>/artist`, `<input>/release-group`, and (optionally)
/// `<input>/release.tar.xz`. Outputs land in `output_dir` as
/// `<entity>.filtered`. Skips entirely when the stage manifest still
/// describes the current inputs.
pub fn run_filter(input_dir: &Path, output_dir: &Path, tolerance: f64) -> Result<FilterOutputs> {
    let artist_input = input_dir.join("artist");
    let rg_input = input_dir.join("release-group");
    let release_archive = input_dir.join("release.tar.xz");

    let outputs = FilterOutputs {
        artist: output_dir.join("artist.filtered"),
        release_group: output_dir.join("release-group.filtered"),
        release: release_archive
            .exists()
            .then(|| output_dir.join("release.filtered")),
    };

    let mut sources = vec![artist_input.clone(), rg_input.clone()];
    if release_archive.exists() {
        sources.push(release_archive.clone());
    }
    let flags = filter_flags(tolerance);

    let manifest_path = output_dir.join(FILTER_MANIFEST);
    if let Some(manifest) = SourceManifest::load(&manifest_path)
        && manifest.is_current(&sources, &flags)
        && outputs_exist(&outputs)
    {
        info!("Filtered files are up to date, skipping filter stage");
        return Ok(outputs);
    }

    let artist_stats = filter_artist(&artist_input, &outputs.artist, tolerance)?;
    log_stats("artist", &artist_stats);

    let rg_stats = filter_release_group(&rg_input, &outputs.release_group, tolerance)?;
    log_stats("release-group", &rg_stats);

    if let Some(release_output) = &outputs.release {
        let release_stats = filter_release_archive(&release_archive, release_output, tolerance)?;
        log_stats("release", &release_stats);
    } else {
        info!("No release.tar.xz present; albums will carry placeholder releases");
    }

    // The manifest is written last, once every output is durable.
    SourceManifest::capture(&sources, flags).store(&manifest_path)?;
    Ok(outputs)
}

fn filter_flags(tolerance: f64) -> BTreeMap<String, String> {
    let mut flags = BTreeMap::new();
    flags.insert("invalid_line_tolerance".to_string(), tolerance.to_string());
    flags
}

fn outputs_exist(outputs: &FilterOutputs) -> bool {
    outputs.artist.exists()
        && outputs.release_group.exists()
        && outputs.release.as_ref().is_none_or(|p| p.exists())
}

fn log_stats(entity: &str, stats: &FilterStats) {
    info!(
        "{entity}: {} records, {} invalid, {:.1} MB -> {:.1} MB ({:.1}% reduction)",
        stats.records,
        stats.invalid_lines,
        stats.input_bytes as f64 / 1_048_576.0,
        stats.output_bytes as f64 / 1_048_576.0,
        stats.reduction_percent()
    );
}
