//! Record and document models for the mbflat metadata pipeline.
//!
//! This crate owns the data formats shared by every pipeline stage:
//!
//! - `records`: dump records as they appear on disk. Each type decodes both
//!   the raw MusicBrainz shape and the filtered shape produced by the schema
//!   filter, so every consumer sits behind a single tolerant parse boundary.
//! - `documents`: the normalized artist and album documents served to the
//!   downstream consumer, with their exact field names.
//! - `date`: release-date normalization.
//! - `shard`: MBID-sharded output paths (`<kind>/<xx>/<yy>/<mbid>.json`).
//! - `manifest`: per-stage source manifests used for rebuild-or-skip
//!   decisions.
//! - `flags`: the build feature flags persisted into manifests.
//!
//! # Design Principles
//!
//! - **Tolerant decoding**: where the raw and filtered shapes differ
//!   (`release-group.id` vs `release_group_id`, `label-info` vs `labels`,
//!   scalar vs list country, `recording.id` vs `recording_id`), the record
//!   type carries both and resolves them in a fixed order through accessors.
//!   Nothing above the parse boundary sees the difference.
//! - **No invention**: records never synthesize values; absent is absent.
//!   Documents, by contrast, always emit empty containers rather than
//!   omitting them, because that is the downstream contract.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod date;
pub mod documents;
pub mod error;
pub mod flags;
pub mod fsutil;
pub mod manifest;
pub mod records;
pub mod shard;

pub use date::normalize_release_date;
pub use documents::{
    AlbumDocument, AlbumSummary, ArtistBase, ArtistDocument, LinkDocument, MediumDocument,
    RatingDocument, ReleaseDocument, TrackDocument,
};
pub use error::{FormatError, Result};
pub use flags::BuildFlags;
pub use manifest::SourceManifest;
pub use records::{ArtistRecord, MediumRecord, ReleaseGroupRecord, ReleaseRecord, TrackRecord};
pub use shard::{shard_path, shard_rel_path};
