//! Full pipeline walk: archives in, searchable dataset out.

use std::fs::File;
use std::path::Path;

use clap::Parser;
use mbflat_formats::BuildFlags;
use mbflat_index::IndexPaths;
use mbflat_normalize::{ProcessConfig, run_process};
use mbflat_search::{CancellationToken, Metrics, SearchConfig, execute_search, run_fts};
use mbflat_store::{DocumentKind, DocumentStore};
use serde_json::{Value, json};

const ARTIST_ID: &str = "aaaaaaaa-1111-2222-3333-444444444444";
const RG_IDS: [&str; 3] = [
    "99999999-0000-0000-0000-000000000001",
    "99999999-0000-0000-0000-000000000002",
    "99999999-0000-0000-0000-000000000003",
];

fn write_archive(path: &Path, entity: &str, lines: &[String]) {
    let contents = lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>();
    let file = File::create(path).unwrap();
    let xz = xz2::write::XzEncoder::new(file, 6);
    let mut builder = tar::Builder::new(xz);

    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("mbdump/{entity}"), contents.as_bytes())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

fn seed_archives(input: &Path) {
    let artists = vec![
        json!({
            "id": ARTIST_ID,
            "name": "Chromatic Spiral",
            "sort-name": "Chromatic Spiral",
            "type": "Group",
            "life-span": {"ended": false},
            "country": "IS",
        })
        .to_string(),
    ];
    write_archive(&input.join("artist.tar.xz"), "artist", &artists);

    let release_groups: Vec<String> = RG_IDS
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "title": format!("Volume {}", i + 1),
                "primary-type": "Album",
                "first-release-date": format!("199{}", i + 1),
                "artist-credit": [{
                    "artist": {"id": ARTIST_ID, "name": "Chromatic Spiral"},
                    "name": "Chromatic Spiral",
                }],
            })
            .to_string()
        })
        .collect();
    write_archive(
        &input.join("release-group.tar.xz"),
        "release-group",
        &release_groups,
    );

    // One real release for the first release-group only.
    let releases = vec![
        json!({
            "id": "rrrrrrrr-0000-0000-0000-000000000001",
            "title": "Volume 1",
            "status": "Official",
            "date": "1991-03-04",
            "country": "IS",
            "release-group": {"id": RG_IDS[0]},
            "label-info": [{"label": {"name": "Spiral Tapes"}}],
            "media": [{
                "position": 1,
                "format": "CD",
                "track-count": 1,
                "tracks": [{
                    "id": "tttttttt-0000-0000-0000-000000000001",
                    "title": "Opening",
                    "number": "1",
                    "position": 1,
                    "length": 215_000,
                    "recording": {"id": "cccccccc-0000-0000-0000-000000000001"},
                    "artist-credit": [{"artist": {"id": ARTIST_ID}}],
                }],
            }],
        })
        .to_string(),
    ];
    write_archive(&input.join("release.tar.xz"), "release", &releases);
}

#[test]
fn archives_become_a_searchable_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("current");
    let output = dir.path().join("processed");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::create_dir_all(&output).unwrap();
    seed_archives(&input);

    // Extract and filter.
    mbflat_dump::run_extract(&input).unwrap();
    assert!(input.join("artist").exists());
    assert!(
        !input.join("release").exists(),
        "release dump must never be extracted"
    );
    let outputs = mbflat_dump::run_filter(&input, &output, 0.0).unwrap();
    let release_filtered = outputs.release.expect("release archive was streamed");

    // Index.
    let flags = BuildFlags {
        use_full_release_data: true,
        ..BuildFlags::default()
    };
    let index_paths = IndexPaths::new(output.join("indexes"));
    mbflat_index::run_index(
        &outputs.artist,
        &outputs.release_group,
        Some(release_filtered.as_path()),
        &index_paths,
        &flags,
    )
    .unwrap();

    // Search index and processing.
    run_fts(&outputs.artist, &output).unwrap();
    let process_config = ProcessConfig {
        artist_file: outputs.artist.clone(),
        release_group_file: outputs.release_group.clone(),
        release_file: Some(release_filtered),
        index_dir: output.join("indexes"),
        output_dir: output.clone(),
        flags,
        max_artists: None,
        max_failed_artists: None,
    };
    let outcome = run_process(&process_config).unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.albums_written, 3);

    // Join correctness: three summaries, one document per release-group,
    // sorted ascending by title.
    let store = DocumentStore::new(&output);
    let artist: Value = store.read_value(DocumentKind::Artist, ARTIST_ID).unwrap();
    let albums = artist["Albums"].as_array().unwrap();
    assert_eq!(albums.len(), 3);
    let titles: Vec<&str> = albums.iter().map(|a| a["Title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Volume 1", "Volume 2", "Volume 3"]);
    for rg_id in RG_IDS {
        let album: Value = store.read_value(DocumentKind::Album, rg_id).unwrap();
        assert_eq!(album["artistid"], ARTIST_ID);
    }

    // The release-group with real release data carries its tracks; the
    // others carry placeholders.
    let with_release: Value = store.read_value(DocumentKind::Album, RG_IDS[0]).unwrap();
    assert_eq!(
        with_release["releases"][0]["tracks"][0]["trackname"],
        "Opening"
    );
    assert_eq!(with_release["releases"][0]["label"][0], "Spiral Tapes");
    let placeholder: Value = store.read_value(DocumentKind::Album, RG_IDS[1]).unwrap();
    assert_eq!(placeholder["releases"][0]["tracks"][0]["trackname"], "Track 1");

    // The artist is findable through the search engine.
    let search_config = SearchConfig::try_parse_from([
        "mbflat-search",
        "--db-dir",
        output.to_str().unwrap(),
        "--docs-root",
        output.to_str().unwrap(),
    ])
    .unwrap();
    let results = execute_search(
        &search_config,
        &store,
        &Metrics::default(),
        &CancellationToken::new(),
        "chromatic spiral",
        10,
    )
    .unwrap();
    assert_eq!(results[0].artist["id"], ARTIST_ID);
    assert!(results[0].score >= 100, "exact match should be boosted");
}
