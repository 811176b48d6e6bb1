//! Dump record models.
//!
//! Every type here decodes both the raw MusicBrainz NDJSON shape and the
//! filtered shape written by the schema filter. Where the two disagree, the
//! struct carries both fields and an accessor resolves them in a fixed
//! order: filtered (flat) first, raw (nested) second, never guessed.

use serde::Deserialize;

/// An object referenced only by its `name` (aliases, tags, genres, areas).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRef {
    /// Display name; absent names are skipped by consumers.
    pub name: Option<String>,
}

/// Artist life-span; only the `ended` flag is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifeSpan {
    /// Whether the artist's life-span has ended.
    #[serde(default)]
    pub ended: Option<bool>,
}

/// A URL relation target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlRef {
    /// The link target.
    pub resource: Option<String>,
}

/// An artist relation; relations without a URL are dropped downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relation {
    /// Relation type, e.g. `official homepage`.
    #[serde(rename = "type")]
    pub rel_type: Option<String>,
    /// URL payload, when the relation points at one.
    pub url: Option<UrlRef>,
}

/// Community rating attached to artists and release-groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rating {
    /// Number of votes behind the rating.
    #[serde(rename = "votes-count", alias = "vote-count", default)]
    pub votes_count: u32,
    /// Rating value; may be null in the dump.
    pub value: Option<f64>,
}

/// A referenced artist inside an artist-credit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRef {
    /// Artist MBID.
    pub id: Option<String>,
    /// Artist name at credit time.
    pub name: Option<String>,
}

/// One position of an artist-credit. The first position is canonical
/// wherever a credit is consulted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistCredit {
    /// The credited artist.
    pub artist: Option<ArtistRef>,
    /// Credit display name.
    pub name: Option<String>,
}

/// An artist dump record (raw or filtered shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRecord {
    /// Stable MBID.
    pub id: String,
    /// Artist name.
    pub name: Option<String>,
    /// Sort name.
    #[serde(rename = "sort-name")]
    pub sort_name: Option<String>,
    /// Artist type (`Person`, `Group`, ...).
    #[serde(rename = "type")]
    pub artist_type: Option<String>,
    /// Disambiguation comment.
    pub disambiguation: Option<String>,
    /// Life-span; only `ended` survives filtering.
    #[serde(rename = "life-span")]
    pub life_span: Option<LifeSpan>,
    /// ISO country code.
    pub country: Option<String>,
    /// Gender, for persons.
    pub gender: Option<String>,
    /// Area reference; only the name survives filtering.
    pub area: Option<NameRef>,
    /// Alias list.
    #[serde(default)]
    pub aliases: Vec<NameRef>,
    /// Folksonomy tags.
    #[serde(default)]
    pub tags: Vec<NameRef>,
    /// Curated genres.
    #[serde(default)]
    pub genres: Vec<NameRef>,
    /// URL relations.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Community rating.
    pub rating: Option<Rating>,
    /// Free-text annotation; present only in the raw dump.
    pub annotation: Option<String>,
}

impl ArtistRecord {
    /// Whether the artist's life-span indicates it has ended.
    pub fn ended(&self) -> bool {
        self.life_span
            .as_ref()
            .and_then(|ls| ls.ended)
            .unwrap_or(false)
    }
}

/// A release-group dump record (raw or filtered shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseGroupRecord {
    /// Stable MBID.
    pub id: String,
    /// Release-group title.
    pub title: Option<String>,
    /// Primary type (`Album`, `EP`, `Single`, ...).
    #[serde(rename = "primary-type")]
    pub primary_type: Option<String>,
    /// Secondary types (`Live`, `Compilation`, ...).
    #[serde(rename = "secondary-types", default)]
    pub secondary_types: Vec<String>,
    /// Earliest release date across the group's releases.
    #[serde(rename = "first-release-date")]
    pub first_release_date: Option<String>,
    /// Disambiguation comment.
    pub disambiguation: Option<String>,
    /// Artist credit; the first position owns the release-group.
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Folksonomy tags.
    #[serde(default)]
    pub tags: Vec<NameRef>,
    /// Curated genres.
    #[serde(default)]
    pub genres: Vec<NameRef>,
    /// Community rating.
    pub rating: Option<Rating>,
    /// Alias list; present only in the raw dump.
    #[serde(default)]
    pub aliases: Vec<NameRef>,
    /// URL relations; present only in the raw dump.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Free-text annotation; present only in the raw dump.
    pub annotation: Option<String>,
}

impl ReleaseGroupRecord {
    /// MBID of the first-position credited artist, if any.
    ///
    /// A release-group without an artist-credit is not associated with any
    /// artist and is ignored by the join indexer.
    pub fn credited_artist_id(&self) -> Option<&str> {
        self.artist_credit
            .first()
            .and_then(|ac| ac.artist.as_ref())
            .and_then(|a| a.id.as_deref())
    }
}

/// A referenced recording inside a raw track.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingRef {
    /// Recording MBID.
    pub id: Option<String>,
}

/// A track inside a medium (raw or filtered shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackRecord {
    /// Track MBID.
    pub id: Option<String>,
    /// Track title.
    pub title: Option<String>,
    /// Display number, e.g. `"1"` or `"A1"`.
    pub number: Option<String>,
    /// Position within the medium.
    pub position: Option<u32>,
    /// Duration in milliseconds.
    pub length: Option<u64>,
    /// Flattened credited-artist MBID (filtered shape).
    pub artist_id: Option<String>,
    /// Raw artist-credit (raw shape).
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Flattened recording MBID (filtered shape).
    pub recording_id: Option<String>,
    /// Nested recording reference (raw shape).
    pub recording: Option<RecordingRef>,
    /// Position of the containing medium (filtered shape).
    pub medium_position: Option<u32>,
}

impl TrackRecord {
    /// Recording MBID: flattened field first, nested reference second.
    pub fn recording_id(&self) -> Option<&str> {
        self.recording_id
            .as_deref()
            .or_else(|| self.recording.as_ref().and_then(|r| r.id.as_deref()))
    }

    /// Credited-artist MBID: flattened field first, first credit second.
    pub fn artist_id(&self) -> Option<&str> {
        self.artist_id.as_deref().or_else(|| {
            self.artist_credit
                .first()
                .and_then(|ac| ac.artist.as_ref())
                .and_then(|a| a.id.as_deref())
        })
    }

    /// Display number, falling back to the stringified position.
    pub fn track_number(&self) -> String {
        match (&self.number, self.position) {
            (Some(n), _) => n.clone(),
            (None, Some(p)) => p.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// A medium (disc/side) of a release.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediumRecord {
    /// Position of the medium within the release.
    pub position: Option<u32>,
    /// Format, e.g. `CD` or `12" Vinyl`.
    pub format: Option<String>,
    /// Number of tracks on the medium.
    #[serde(rename = "track_count", alias = "track-count", default)]
    pub track_count: u32,
    /// Medium title.
    pub title: Option<String>,
    /// Track list.
    #[serde(default)]
    pub tracks: Vec<TrackRecord>,
}

/// A nested release-group reference on a raw release.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseGroupRef {
    /// Release-group MBID.
    pub id: Option<String>,
}

/// Label info wrapper on a raw release.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelInfo {
    /// The label itself, referenced by name.
    pub label: Option<NameRef>,
}

/// A release dump record (raw or filtered shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseRecord {
    /// Stable MBID.
    pub id: String,
    /// Release title.
    pub title: Option<String>,
    /// Release status (`Official`, `Promotion`, ...).
    pub status: Option<String>,
    /// Release date.
    pub date: Option<String>,
    /// Release countries. The raw dump carries a scalar; it is coerced to a
    /// one-element list at the parse boundary.
    #[serde(default, deserialize_with = "country_list")]
    pub country: Vec<String>,
    /// Disambiguation comment.
    pub disambiguation: Option<String>,
    /// Flattened release-group MBID (filtered shape).
    pub release_group_id: Option<String>,
    /// Nested release-group reference (raw shape).
    #[serde(rename = "release-group")]
    pub release_group: Option<ReleaseGroupRef>,
    /// Flattened label names (filtered shape).
    pub labels: Option<Vec<String>>,
    /// Raw label-info list (raw shape).
    #[serde(rename = "label-info", default)]
    pub label_info: Vec<LabelInfo>,
    /// Media carrying the track lists.
    #[serde(default)]
    pub media: Vec<MediumRecord>,
}

impl ReleaseRecord {
    /// Owning release-group MBID: flattened field first, nested second.
    ///
    /// Returns `None` when the record carries neither shape; such releases
    /// are never indexed.
    pub fn release_group_id(&self) -> Option<&str> {
        self.release_group_id
            .as_deref()
            .or_else(|| self.release_group.as_ref().and_then(|rg| rg.id.as_deref()))
    }

    /// Label names: flattened list first, `label-info` names second.
    pub fn label_names(&self) -> Vec<String> {
        if let Some(labels) = &self.labels {
            return labels.clone();
        }
        self.label_info
            .iter()
            .filter_map(|li| li.label.as_ref())
            .filter_map(|l| l.name.clone())
            .collect()
    }
}

/// Accept a scalar country, a list of countries, or null.
fn country_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Scalar(String),
        List(Vec<String>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Scalar(country)) => vec![country],
        Some(Raw::List(countries)) => countries,
        None => Vec::new(),
    })
}
