//! Per-artist normalization.
//!
//! For every artist in the offset index, this crate performs targeted
//! seek-reads through the byte-offset and join indexes — artist line,
//! its release-group lines, optionally each group's release lines — and
//! emits one normalized artist document plus one normalized album
//! document per surviving release-group into the sharded store, while
//! streaming one row per album into the album search database.
//!
//! Artists are independent units of work: an I/O or data failure fails
//! that artist only. Resume relies solely on destination-file existence —
//! a crash before an artist document's rename leaves no visible output
//! for that MBID.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod normalize;
pub mod processor;

pub use error::{NormalizeError, Result};
pub use normalize::{NormalizedAlbum, normalize_album, normalize_artist, normalize_artist_base};
pub use processor::{ProcessConfig, ProcessOutcome, run_process};
