//! Normalized output documents.
//!
//! Field names here are the downstream consumer's contract and must not be
//! renamed. Containers are always emitted, empty rather than absent; the
//! single exception is the artist's `area`, which is omitted when the
//! artist has none.

use serde::{Deserialize, Serialize};

/// Rating attached to artists and albums; defaults to zero when the dump
/// carries none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingDocument {
    /// Number of votes.
    pub count: u32,
    /// Rating value.
    pub value: f64,
}

/// A typed web link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDocument {
    /// Relation type, e.g. `official homepage`.
    #[serde(rename = "type")]
    pub link_type: String,
    /// Link target URL.
    pub target: String,
}

/// The artist fields shared between the standalone artist document and the
/// artist list embedded in album documents. The embedded form carries no
/// album summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistBase {
    /// Artist MBID.
    pub id: String,
    /// Artist MBID again, under the downstream field name.
    pub artistid: String,
    /// Artist name.
    pub artistname: Option<String>,
    /// Sort name.
    pub sortname: Option<String>,
    /// Disambiguation comment.
    pub disambiguation: Option<String>,
    /// Artist type; `"Unknown"` when the dump has none.
    #[serde(rename = "type")]
    pub artist_type: String,
    /// Gender, for persons.
    pub gender: Option<String>,
    /// ISO country code.
    pub country: Option<String>,
    /// Area name; omitted when the artist has no area.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub area: Option<String>,
    /// `"ended"` or `"active"`, from the life-span.
    pub status: String,
    /// Alias names, order preserved.
    pub artistaliases: Vec<String>,
    /// Tag names.
    pub tags: Vec<String>,
    /// Community rating.
    pub rating: RatingDocument,
    /// Deduplicated genre names.
    pub genres: Vec<String>,
    /// Web links.
    pub links: Vec<LinkDocument>,
    /// Always empty; images are not sourced from the dump.
    pub images: Vec<serde_json::Value>,
    /// Annotation text or empty.
    pub overview: String,
    /// Always empty.
    pub oldids: Vec<String>,
}

/// Summary of one album embedded in the artist document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumSummary {
    /// Release-group MBID.
    #[serde(rename = "Id")]
    pub id: String,
    /// Album title.
    #[serde(rename = "Title")]
    pub title: Option<String>,
    /// Primary type.
    #[serde(rename = "Type")]
    pub album_type: Option<String>,
    /// Secondary types.
    #[serde(rename = "SecondaryTypes")]
    pub secondary_types: Vec<String>,
    /// Sorted distinct statuses across the group's releases;
    /// `["Official"]` when no releases were loaded.
    #[serde(rename = "ReleaseStatuses")]
    pub release_statuses: Vec<String>,
    /// Always empty.
    #[serde(rename = "OldIds")]
    pub old_ids: Vec<String>,
}

/// A fully normalized artist document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDocument {
    /// The shared artist fields.
    #[serde(flatten)]
    pub base: ArtistBase,
    /// Album summaries, sorted ascending by title.
    #[serde(rename = "Albums")]
    pub albums: Vec<AlbumSummary>,
}

/// One medium of a normalized release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediumDocument {
    /// Medium format; `"Unknown"` when the dump has none.
    #[serde(rename = "Format")]
    pub format: String,
    /// Medium title or empty.
    #[serde(rename = "Name")]
    pub name: String,
    /// Position within the release.
    #[serde(rename = "Position")]
    pub position: Option<u32>,
}

/// One track of a normalized release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDocument {
    /// Track MBID (or a placeholder key).
    pub id: Option<String>,
    /// Track title.
    pub trackname: Option<String>,
    /// Display number as a string.
    pub tracknumber: String,
    /// Position within the medium.
    pub trackposition: Option<u32>,
    /// Duration in milliseconds.
    pub durationms: Option<u64>,
    /// Credited artist, falling back to the album artist.
    pub artistid: Option<String>,
    /// Recording MBID or empty.
    pub recordingid: String,
    /// Position of the containing medium.
    pub mediumnumber: Option<u32>,
    /// Always empty.
    pub oldids: Vec<String>,
    /// Always empty.
    pub oldrecordingids: Vec<String>,
}

/// One normalized release of an album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDocument {
    /// Release MBID (the release-group MBID for placeholder releases).
    pub id: String,
    /// Release title.
    pub title: String,
    /// Release status.
    pub status: String,
    /// Normalized release date.
    pub releasedate: String,
    /// Release countries; always a list.
    pub country: Vec<String>,
    /// Label names.
    pub label: Vec<String>,
    /// Media list.
    pub media: Vec<MediumDocument>,
    /// Total track count across media.
    pub track_count: u32,
    /// Flattened track list.
    pub tracks: Vec<TrackDocument>,
}

/// A fully normalized album document: one release-group with its releases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumDocument {
    /// Release-group MBID.
    pub id: String,
    /// Album title.
    pub title: String,
    /// Owning artist MBID.
    pub artistid: String,
    /// Primary type; `"Album"` when the dump has none.
    #[serde(rename = "type")]
    pub album_type: String,
    /// Disambiguation comment or empty.
    pub disambiguation: String,
    /// Annotation text or empty.
    pub overview: String,
    /// Normalized first release date.
    pub releasedate: String,
    /// Community rating.
    pub rating: RatingDocument,
    /// Deduplicated genre names.
    pub genres: Vec<String>,
    /// Normalized releases; a single placeholder when no release data was
    /// loaded.
    pub releases: Vec<ReleaseDocument>,
    /// Secondary types.
    pub secondarytypes: Vec<String>,
    /// The owning artist, embedded without album summaries.
    pub artists: Vec<ArtistBase>,
    /// Always empty.
    pub images: Vec<serde_json::Value>,
    /// Web links.
    pub links: Vec<LinkDocument>,
    /// Alias names.
    pub aliases: Vec<String>,
    /// Always empty.
    pub oldids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artist_document_flattens_base_fields() {
        let base = ArtistBase {
            id: "m1".into(),
            artistid: "m1".into(),
            artistname: Some("Sigur Rós".into()),
            sortname: Some("Sigur Rós".into()),
            disambiguation: None,
            artist_type: "Group".into(),
            gender: None,
            country: Some("IS".into()),
            area: None,
            status: "active".into(),
            artistaliases: vec![],
            tags: vec![],
            rating: RatingDocument::default(),
            genres: vec![],
            links: vec![],
            images: vec![],
            overview: String::new(),
            oldids: vec![],
        };
        let doc = ArtistDocument {
            base,
            albums: vec![],
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["id"], "m1");
        assert_eq!(value["artistname"], "Sigur Rós");
        assert!(value["Albums"].as_array().unwrap().is_empty());
        // Area is omitted entirely when absent.
        assert!(value.get("area").is_none());

        let back: ArtistDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn album_summary_uses_downstream_casing() {
        let summary = AlbumSummary {
            id: "g1".into(),
            title: Some("OK Computer".into()),
            album_type: Some("Album".into()),
            secondary_types: vec![],
            release_statuses: vec!["Official".into()],
            old_ids: vec![],
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["Id"], "g1");
        assert_eq!(value["Title"], "OK Computer");
        assert_eq!(value["ReleaseStatuses"][0], "Official");
    }
}
