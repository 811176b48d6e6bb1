//! Record → document normalization.
//!
//! Pure functions from dump records to the downstream document schema.
//! Containers are always emitted; the placeholder release keeps album
//! documents well-formed when the run has no release data.

use std::collections::BTreeSet;

use mbflat_formats::records::{ArtistRecord, NameRef, Rating, Relation, ReleaseGroupRecord, ReleaseRecord};
use mbflat_formats::{
    AlbumDocument, AlbumSummary, ArtistBase, ArtistDocument, LinkDocument, MediumDocument,
    RatingDocument, ReleaseDocument, TrackDocument, normalize_release_date,
};

/// Normalize the shared artist fields, used standalone and embedded in
/// album documents.
pub fn normalize_artist_base(artist: &ArtistRecord) -> ArtistBase {
    ArtistBase {
        id: artist.id.clone(),
        artistid: artist.id.clone(),
        artistname: artist.name.clone(),
        sortname: artist.sort_name.clone(),
        disambiguation: artist.disambiguation.clone(),
        artist_type: artist
            .artist_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        gender: artist.gender.clone(),
        country: artist.country.clone(),
        area: artist.area.as_ref().and_then(|area| area.name.clone()),
        status: if artist.ended() { "ended" } else { "active" }.to_string(),
        artistaliases: names(&artist.aliases),
        tags: names(&artist.tags),
        rating: rating_document(artist.rating.as_ref()),
        genres: genre_names(&artist.genres, &artist.tags),
        links: links(&artist.relations),
        images: Vec::new(),
        overview: artist.annotation.clone().unwrap_or_default(),
        oldids: Vec::new(),
    }
}

/// Normalize an artist together with its album summaries.
///
/// `albums` is sorted ascending by title before embedding, using the
/// dump's natural Unicode ordering.
pub fn normalize_artist(artist: &ArtistRecord, mut albums: Vec<AlbumSummary>) -> ArtistDocument {
    albums.sort_by(|a, b| {
        a.title
            .as_deref()
            .unwrap_or("")
            .cmp(b.title.as_deref().unwrap_or(""))
    });
    ArtistDocument {
        base: normalize_artist_base(artist),
        albums,
    }
}

/// A normalized album plus the distinct statuses of its releases, which
/// feed the owning artist's album summary.
#[derive(Debug)]
pub struct NormalizedAlbum {
    /// The album document to write.
    pub document: AlbumDocument,
    /// Sorted distinct release statuses; `["Official"]` when no release
    /// data was loaded.
    pub release_statuses: Vec<String>,
}

impl NormalizedAlbum {
    /// Album summary entry for the owning artist document.
    pub fn summary(&self) -> AlbumSummary {
        let document = &self.document;
        AlbumSummary {
            id: document.id.clone(),
            title: Some(document.title.clone()),
            album_type: Some(document.album_type.clone()),
            secondary_types: document.secondarytypes.clone(),
            release_statuses: self.release_statuses.clone(),
            old_ids: Vec::new(),
        }
    }
}

/// Normalize one release-group into an album document.
///
/// With no loaded releases the album carries a single placeholder release
/// keyed by the release-group's MBID, so downstream consumers always see
/// a well-formed album.
pub fn normalize_album(
    rg: &ReleaseGroupRecord,
    artist: &ArtistRecord,
    releases: &[ReleaseRecord],
) -> NormalizedAlbum {
    let (release_documents, release_statuses) = if releases.is_empty() {
        (
            vec![placeholder_release(rg, artist)],
            vec!["Official".to_string()],
        )
    } else {
        let mut statuses = BTreeSet::new();
        let documents = releases
            .iter()
            .map(|release| {
                let document = normalize_release(release, artist);
                statuses.insert(document.status.clone());
                document
            })
            .collect();
        (documents, statuses.into_iter().collect())
    };

    let document = AlbumDocument {
        id: rg.id.clone(),
        title: rg.title.clone().unwrap_or_default(),
        artistid: artist.id.clone(),
        album_type: rg
            .primary_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Album".to_string()),
        disambiguation: rg.disambiguation.clone().unwrap_or_default(),
        overview: rg.annotation.clone().unwrap_or_default(),
        releasedate: normalize_release_date(rg.first_release_date.as_deref().unwrap_or("")),
        rating: rating_document(rg.rating.as_ref()),
        genres: genre_names(&rg.genres, &rg.tags),
        releases: release_documents,
        secondarytypes: rg.secondary_types.clone(),
        artists: vec![normalize_artist_base(artist)],
        images: Vec::new(),
        links: links(&rg.relations),
        aliases: names(&rg.aliases),
        oldids: Vec::new(),
    };

    NormalizedAlbum {
        document,
        release_statuses,
    }
}

fn normalize_release(release: &ReleaseRecord, artist: &ArtistRecord) -> ReleaseDocument {
    let mut tracks = Vec::new();
    for medium in &release.media {
        for track in &medium.tracks {
            tracks.push(TrackDocument {
                id: track.id.clone(),
                trackname: track.title.clone(),
                tracknumber: track.track_number(),
                trackposition: track.position,
                durationms: track.length,
                artistid: track
                    .artist_id()
                    .map(ToString::to_string)
                    .or_else(|| Some(artist.id.clone())),
                recordingid: track.recording_id().unwrap_or_default().to_string(),
                mediumnumber: track.medium_position.or(medium.position),
                oldids: Vec::new(),
                oldrecordingids: Vec::new(),
            });
        }
    }

    let media = release
        .media
        .iter()
        .map(|medium| MediumDocument {
            format: medium
                .format
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            name: medium.title.clone().unwrap_or_default(),
            position: medium.position,
        })
        .collect();

    ReleaseDocument {
        id: release.id.clone(),
        title: release.title.clone().unwrap_or_default(),
        status: release
            .status
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        releasedate: normalize_release_date(release.date.as_deref().unwrap_or("")),
        country: release.country.clone(),
        label: release.label_names(),
        media,
        track_count: tracks.len() as u32,
        tracks,
    }
}

fn placeholder_release(rg: &ReleaseGroupRecord, artist: &ArtistRecord) -> ReleaseDocument {
    ReleaseDocument {
        id: rg.id.clone(),
        title: rg.title.clone().unwrap_or_default(),
        status: "Official".to_string(),
        releasedate: normalize_release_date(rg.first_release_date.as_deref().unwrap_or("")),
        country: Vec::new(),
        label: Vec::new(),
        media: vec![MediumDocument {
            format: "CD".to_string(),
            name: String::new(),
            position: Some(1),
        }],
        track_count: 1,
        tracks: vec![TrackDocument {
            id: Some(format!("placeholder-track-{}-1", rg.id)),
            trackname: Some("Track 1".to_string()),
            tracknumber: "1".to_string(),
            trackposition: Some(1),
            durationms: Some(0),
            artistid: Some(artist.id.clone()),
            recordingid: String::new(),
            mediumnumber: Some(1),
            oldids: Vec::new(),
            oldrecordingids: Vec::new(),
        }],
    }
}

fn names(refs: &[NameRef]) -> Vec<String> {
    refs.iter().filter_map(|r| r.name.clone()).collect()
}

/// Deduplicated genre names: genre records when the dump carries them,
/// tag names otherwise.
fn genre_names(genres: &[NameRef], tags: &[NameRef]) -> Vec<String> {
    let source = if genres.iter().any(|g| g.name.is_some()) {
        genres
    } else {
        tags
    };
    let mut seen = BTreeSet::new();
    names(source)
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn links(relations: &[Relation]) -> Vec<LinkDocument> {
    relations
        .iter()
        .filter_map(|rel| {
            let target = rel.url.as_ref()?.resource.clone()?;
            Some(LinkDocument {
                link_type: rel.rel_type.clone().unwrap_or_default(),
                target,
            })
        })
        .collect()
}

fn rating_document(rating: Option<&Rating>) -> RatingDocument {
    rating.map_or_else(RatingDocument::default, |r| RatingDocument {
        count: r.votes_count,
        value: r.value.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artist_fixture() -> ArtistRecord {
        serde_json::from_str(
            r#"{
                "id": "a1",
                "name": "Radiohead",
                "sort-name": "Radiohead",
                "disambiguation": "",
                "life-span": {"ended": false},
                "country": "GB",
                "area": {"name": "United Kingdom"},
                "aliases": [{"name": "The Radioheads"}, {"locale": "ja"}],
                "tags": [{"name": "rock"}, {"name": "alternative"}, {"name": "rock"}],
                "relations": [
                    {"type": "official homepage", "url": {"resource": "https://radiohead.com"}},
                    {"type": "member"}
                ],
                "rating": {"votes-count": 42, "value": 4.5}
            }"#,
        )
        .unwrap()
    }

    fn rg_fixture() -> ReleaseGroupRecord {
        serde_json::from_str(
            r#"{
                "id": "g1",
                "title": "OK Computer",
                "primary-type": "Album",
                "secondary-types": [],
                "first-release-date": "1997-05",
                "artist-credit": [{"artist": {"id": "a1", "name": "Radiohead"}}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn artist_base_fills_defaults() {
        let base = normalize_artist_base(&artist_fixture());
        assert_eq!(base.artist_type, "Unknown");
        assert_eq!(base.status, "active");
        assert_eq!(base.area.as_deref(), Some("United Kingdom"));
        assert_eq!(base.artistaliases, vec!["The Radioheads"]);
        assert_eq!(base.tags, vec!["rock", "alternative", "rock"]);
        assert_eq!(base.genres, vec!["rock", "alternative"], "genres deduplicate");
        assert_eq!(base.links.len(), 1, "relations without a URL are dropped");
        assert_eq!(base.rating.count, 42);
        assert_eq!(base.overview, "");
    }

    #[test]
    fn ended_life_span_maps_to_ended_status() {
        let artist: ArtistRecord =
            serde_json::from_str(r#"{"id": "a2", "life-span": {"ended": true}}"#).unwrap();
        let base = normalize_artist_base(&artist);
        assert_eq!(base.status, "ended");
        assert!(base.area.is_none());
    }

    #[test]
    fn albums_sort_ascending_by_title() {
        let artist = artist_fixture();
        let summaries = ["Kid A", "Amnesiac", "OK Computer"]
            .iter()
            .enumerate()
            .map(|(i, title)| AlbumSummary {
                id: format!("g{i}"),
                title: Some((*title).to_string()),
                album_type: Some("Album".to_string()),
                secondary_types: vec![],
                release_statuses: vec!["Official".to_string()],
                old_ids: vec![],
            })
            .collect();

        let document = normalize_artist(&artist, summaries);
        let titles: Vec<&str> = document
            .albums
            .iter()
            .map(|a| a.title.as_deref().unwrap())
            .collect();
        assert_eq!(titles, vec!["Amnesiac", "Kid A", "OK Computer"]);
    }

    #[test]
    fn placeholder_release_without_release_data() {
        let album = normalize_album(&rg_fixture(), &artist_fixture(), &[]);
        assert_eq!(album.release_statuses, vec!["Official"]);

        let releases = &album.document.releases;
        assert_eq!(releases.len(), 1);
        let release = &releases[0];
        assert_eq!(release.id, "g1", "placeholder keyed by the release-group");
        assert_eq!(release.status, "Official");
        assert_eq!(release.media.len(), 1);
        assert_eq!(release.media[0].format, "CD");
        assert_eq!(release.media[0].position, Some(1));
        assert_eq!(release.tracks.len(), 1);
        let track = &release.tracks[0];
        assert_eq!(track.trackname.as_deref(), Some("Track 1"));
        assert_eq!(track.tracknumber, "1");
        assert_eq!(track.trackposition, Some(1));
        assert_eq!(track.durationms, Some(0));
        assert_eq!(track.recordingid, "");
        assert_eq!(track.artistid.as_deref(), Some("a1"));
        assert_eq!(album.document.releasedate, "1997-05-01");
    }

    #[test]
    fn releases_aggregate_sorted_distinct_statuses() {
        let releases: Vec<ReleaseRecord> = [
            r#"{"id": "r1", "title": "US", "status": "Official", "country": ["US"]}"#,
            r#"{"id": "r2", "title": "Promo", "status": "Promotion"}"#,
            r#"{"id": "r3", "title": "JP", "status": "Official", "country": "JP"}"#,
        ]
        .iter()
        .map(|raw| serde_json::from_str(raw).unwrap())
        .collect();

        let album = normalize_album(&rg_fixture(), &artist_fixture(), &releases);
        assert_eq!(album.release_statuses, vec!["Official", "Promotion"]);
        assert_eq!(album.document.releases.len(), 3);
        // Scalar country was coerced to a list at the parse boundary.
        assert_eq!(album.document.releases[2].country, vec!["JP"]);
    }

    #[test]
    fn tracks_resolve_both_shapes_and_fall_back_to_album_artist() {
        let release: ReleaseRecord = serde_json::from_str(
            r#"{
                "id": "r1",
                "title": "X",
                "status": "Official",
                "media": [{
                    "position": 2,
                    "format": "12\" Vinyl",
                    "tracks": [
                        {"id": "t1", "title": "A", "number": "A1", "position": 1,
                         "length": 100, "recording": {"id": "rec1"}},
                        {"id": "t2", "title": "B", "position": 2,
                         "artist_id": "other", "recording_id": "rec2",
                         "medium_position": 2}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let album = normalize_album(&rg_fixture(), &artist_fixture(), &[release]);
        let release = &album.document.releases[0];
        assert_eq!(release.track_count, 2);

        let first = &release.tracks[0];
        assert_eq!(first.tracknumber, "A1");
        assert_eq!(first.recordingid, "rec1");
        assert_eq!(first.artistid.as_deref(), Some("a1"), "falls back to album artist");
        assert_eq!(first.mediumnumber, Some(2), "from the containing medium");

        let second = &release.tracks[1];
        assert_eq!(second.tracknumber, "2", "position stringified");
        assert_eq!(second.artistid.as_deref(), Some("other"));
        assert_eq!(second.recordingid, "rec2");
    }

    #[test]
    fn summary_reflects_document_and_statuses() {
        let album = normalize_album(&rg_fixture(), &artist_fixture(), &[]);
        let summary = album.summary();
        assert_eq!(summary.id, "g1");
        assert_eq!(summary.title.as_deref(), Some("OK Computer"));
        assert_eq!(summary.album_type.as_deref(), Some("Album"));
        assert_eq!(summary.release_statuses, vec!["Official"]);
        assert!(summary.old_ids.is_empty());
    }

    #[test]
    fn release_date_normalization_contract() {
        for (input, expected) in [
            ("1997", "1997-01-01"),
            ("1997-05", "1997-05-01"),
            ("1997-05-21", "1997-05-21"),
            ("", ""),
        ] {
            assert_eq!(normalize_release_date(input), expected);
        }
    }
}
