//! Schema-guided streaming filter.
//!
//! One pass per entity, each input line parsed, projected down to the
//! fields the normalizer consumes, and re-serialized compactly. The filter
//! is a pure projection: no field is invented and no value re-encoded.
//! Lines that fail to parse are counted, logged, and skipped; the run
//! fails if the invalid ratio exceeds the configured tolerance.
//!
//! Empty-value rules are fixed per entity and stable across reruns:
//! the release-group projection drops top-level nulls and empty arrays,
//! the artist and release projections drop only top-level nulls.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::{DumpError, Result};
use crate::extract::with_member_stream;

/// Line buffer sizing for the large dump files.
const READ_BUFFER: usize = 1 << 20;

/// Counters for one filter pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterStats {
    /// Records successfully projected and written.
    pub records: u64,
    /// Lines that failed to parse and were skipped.
    pub invalid_lines: u64,
    /// Bytes consumed from the input.
    pub input_bytes: u64,
    /// Bytes written to the filtered output.
    pub output_bytes: u64,
}

impl FilterStats {
    /// Size reduction achieved by the projection, in percent.
    pub fn reduction_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0
    }
}

/// Filter the artist dump file to `output`.
pub fn filter_artist(input: &Path, output: &Path, tolerance: f64) -> Result<FilterStats> {
    let reader = File::open(input)?;
    filter_ndjson(reader, output, "artist", project_artist, EmptyRule::DropNulls, tolerance)
}

/// Filter the release-group dump file to `output`.
pub fn filter_release_group(input: &Path, output: &Path, tolerance: f64) -> Result<FilterStats> {
    let reader = File::open(input)?;
    filter_ndjson(
        reader,
        output,
        "release-group",
        project_release_group,
        EmptyRule::DropNullsAndEmptyArrays,
        tolerance,
    )
}

/// Filter the release dump straight out of its `.tar.xz` archive.
///
/// The decompressed dump never touches disk; the tar member is consumed
/// line by line with bounded memory.
pub fn filter_release_archive(archive: &Path, output: &Path, tolerance: f64) -> Result<FilterStats> {
    with_member_stream(archive, "release", |reader| {
        filter_ndjson(reader, output, "release", project_release, EmptyRule::DropNulls, tolerance)
    })
}

/// Top-level empty-value rule applied after projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyRule {
    DropNulls,
    DropNullsAndEmptyArrays,
}

impl EmptyRule {
    fn keeps(self, value: &Value) -> bool {
        match self {
            Self::DropNulls => !value.is_null(),
            Self::DropNullsAndEmptyArrays => {
                !value.is_null() && !value.as_array().is_some_and(Vec::is_empty)
            }
        }
    }
}

fn filter_ndjson<R: io::Read>(
    reader: R,
    output: &Path,
    entity: &str,
    project: fn(&Map<String, Value>) -> Map<String, Value>,
    empty_rule: EmptyRule,
    tolerance: f64,
) -> Result<FilterStats> {
    info!("Filtering {entity} records to {}", output.display());

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = output.with_extension("filter-tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let mut reader = BufReader::with_capacity(READ_BUFFER, reader);

    let mut stats = FilterStats::default();
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        stats.input_bytes += read as u64;

        let record = match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                stats.invalid_lines += 1;
                warn!(
                    "Skipping invalid JSON line {} in {entity} input",
                    stats.records + stats.invalid_lines
                );
                continue;
            }
        };

        let mut projected = project(&record);
        projected.retain(|_, value| empty_rule.keeps(value));

        let serialized = serde_json::to_string(&Value::Object(projected))
            .map_err(mbflat_formats::FormatError::from)?;
        writer.write_all(serialized.as_bytes())?;
        writer.write_all(b"\n")?;
        stats.output_bytes += serialized.len() as u64 + 1;
        stats.records += 1;

        if stats.records % 100_000 == 0 {
            info!(
                "Processed {} {entity} records, {:.1}% reduction",
                stats.records,
                stats.reduction_percent()
            );
        }
    }

    let total = stats.records + stats.invalid_lines;
    if stats.invalid_lines > 0 && total > 0 {
        let ratio = stats.invalid_lines as f64 / total as f64;
        if ratio > tolerance {
            let _ = fs::remove_file(&tmp);
            return Err(DumpError::TooManyInvalidLines {
                invalid: stats.invalid_lines,
                total,
                tolerance,
            });
        }
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(&tmp, output)?;

    info!(
        "Filtered {} {entity} records ({} invalid skipped), {:.1}% reduction",
        stats.records,
        stats.invalid_lines,
        stats.reduction_percent()
    );
    Ok(stats)
}

/// Copy `key` when present and non-null.
fn copy_value(out: &mut Map<String, Value>, record: &Map<String, Value>, key: &str) {
    if let Some(value) = record.get(key)
        && !value.is_null()
    {
        out.insert(key.to_string(), value.clone());
    }
}

/// Copy `key`, defaulting a missing key to `""`. A present null is left
/// for the empty-value rule to drop.
fn copy_string_defaulted(out: &mut Map<String, Value>, record: &Map<String, Value>, key: &str) {
    let value = match record.get(key) {
        None => json!(""),
        Some(value) => value.clone(),
    };
    out.insert(key.to_string(), value);
}

/// Copy an array `key`, defaulting a missing key to `[]`. A present null
/// is left for the empty-value rule to drop.
fn copy_array_defaulted(out: &mut Map<String, Value>, record: &Map<String, Value>, key: &str) {
    let value = match record.get(key) {
        None => json!([]),
        Some(value) => value.clone(),
    };
    out.insert(key.to_string(), value);
}

/// Rating projected to `{votes-count, value}` with a zero vote default.
fn project_rating(record: &Map<String, Value>) -> Value {
    let rating = record.get("rating");
    let votes = rating
        .and_then(|r| r.get("votes-count"))
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!(0));
    let value = rating
        .and_then(|r| r.get("value"))
        .cloned()
        .unwrap_or(Value::Null);
    json!({"votes-count": votes, "value": value})
}

/// Project an artist record to its minimal schema.
pub fn project_artist(record: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    copy_value(&mut out, record, "id");
    copy_value(&mut out, record, "name");
    copy_value(&mut out, record, "sort-name");
    copy_value(&mut out, record, "type");
    copy_string_defaulted(&mut out, record, "disambiguation");

    let ended = record
        .get("life-span")
        .and_then(|ls| ls.get("ended"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    out.insert("life-span".to_string(), json!({ "ended": ended }));

    copy_value(&mut out, record, "country");
    copy_value(&mut out, record, "gender");

    if let Some(area) = record.get("area").filter(|a| a.is_object()) {
        let name = area.get("name").cloned().unwrap_or(Value::Null);
        out.insert("area".to_string(), json!({ "name": name }));
    }

    copy_array_defaulted(&mut out, record, "aliases");
    copy_array_defaulted(&mut out, record, "tags");
    copy_array_defaulted(&mut out, record, "genres");

    let relations: Vec<Value> = record
        .get("relations")
        .and_then(Value::as_array)
        .map(|relations| {
            relations
                .iter()
                .filter_map(|rel| {
                    let resource = rel
                        .get("url")
                        .and_then(|url| url.get("resource"))
                        .and_then(Value::as_str)
                        .filter(|r| !r.is_empty())?;
                    Some(json!({
                        "type": rel.get("type").cloned().unwrap_or(Value::Null),
                        "url": { "resource": resource },
                    }))
                })
                .collect()
        })
        .unwrap_or_default();
    out.insert("relations".to_string(), Value::Array(relations));

    out.insert("rating".to_string(), project_rating(record));
    out
}

/// Project a release-group record to its minimal schema.
pub fn project_release_group(record: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    copy_value(&mut out, record, "id");
    copy_value(&mut out, record, "title");
    copy_value(&mut out, record, "primary-type");
    copy_array_defaulted(&mut out, record, "secondary-types");
    copy_value(&mut out, record, "first-release-date");
    copy_string_defaulted(&mut out, record, "disambiguation");

    let credits: Vec<Value> = record
        .get("artist-credit")
        .and_then(Value::as_array)
        .map(|credits| {
            credits
                .iter()
                .filter_map(|credit| {
                    let artist = credit.get("artist")?;
                    let id = artist.get("id").filter(|id| !id.is_null())?;
                    Some(json!({
                        "artist": {
                            "id": id,
                            "name": artist.get("name").cloned().unwrap_or(Value::Null),
                        },
                        "name": credit.get("name").cloned().unwrap_or(Value::Null),
                    }))
                })
                .collect()
        })
        .unwrap_or_default();
    out.insert("artist-credit".to_string(), Value::Array(credits));

    copy_array_defaulted(&mut out, record, "tags");
    copy_array_defaulted(&mut out, record, "genres");
    out.insert("rating".to_string(), project_rating(record));
    out
}

/// Project a release record to its minimal schema, flattening the
/// release-group reference, labels, and per-track credits.
pub fn project_release(record: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    copy_value(&mut out, record, "id");
    copy_value(&mut out, record, "title");
    copy_value(&mut out, record, "status");
    copy_value(&mut out, record, "date");

    let country = match record.get("country").and_then(Value::as_str) {
        Some(code) if !code.is_empty() => json!([code]),
        _ => json!([]),
    };
    out.insert("country".to_string(), country);

    copy_string_defaulted(&mut out, record, "disambiguation");

    let rg_id = record
        .get("release-group")
        .and_then(|rg| rg.get("id"))
        .cloned()
        .unwrap_or(Value::Null);
    out.insert("release_group_id".to_string(), rg_id);

    let labels: Vec<Value> = record
        .get("label-info")
        .and_then(Value::as_array)
        .map(|infos| {
            infos
                .iter()
                .filter_map(|info| {
                    let name = info
                        .get("label")
                        .and_then(|label| label.get("name"))
                        .and_then(Value::as_str)
                        .filter(|n| !n.is_empty())?;
                    Some(json!(name))
                })
                .collect()
        })
        .unwrap_or_default();
    out.insert("labels".to_string(), Value::Array(labels));

    let media: Vec<Value> = record
        .get("media")
        .and_then(Value::as_array)
        .map(|media| media.iter().map(project_medium).collect())
        .unwrap_or_default();
    out.insert("media".to_string(), Value::Array(media));

    out
}

fn project_medium(medium: &Value) -> Value {
    let position = medium.get("position").cloned().unwrap_or_else(|| json!(1));
    let tracks: Vec<Value> = medium
        .get("tracks")
        .and_then(Value::as_array)
        .map(|tracks| {
            tracks
                .iter()
                .map(|track| project_track(track, &position))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "position": position,
        "format": medium.get("format").cloned().unwrap_or(Value::Null),
        "track_count": medium.get("track-count").cloned().unwrap_or_else(|| json!(0)),
        "tracks": tracks,
    })
}

fn project_track(track: &Value, medium_position: &Value) -> Value {
    // First-position artist credit, tolerating malformed records.
    let artist_id = track
        .get("artist-credit")
        .and_then(Value::as_array)
        .and_then(|credits| credits.first())
        .and_then(|credit| credit.get("artist"))
        .and_then(|artist| artist.get("id"))
        .cloned()
        .unwrap_or(Value::Null);

    let recording_id = track
        .get("recording")
        .and_then(|recording| recording.get("id"))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "id": track.get("id").cloned().unwrap_or(Value::Null),
        "title": track.get("title").cloned().unwrap_or(Value::Null),
        "number": track.get("number").cloned().unwrap_or(Value::Null),
        "position": track.get("position").cloned().unwrap_or(Value::Null),
        "length": track.get("length").cloned().unwrap_or(Value::Null),
        "artist_id": artist_id,
        "recording_id": recording_id,
        "medium_position": medium_position.clone(),
    })
}
