//! End-to-end tests over a small built index: folding, typo tolerance,
//! ranking, caching, and debounce coalescing.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;

use mbflat_search::{
    AppState, CancellationToken, Metrics, SearchConfig, build_artist_fts, execute_search,
};
use mbflat_store::{DocumentKind, DocumentStore};

const ARTISTS: &[(&str, &str)] = &[
    ("11111111-1111-1111-1111-111111111111", "Sigur Rós"),
    ("22222222-2222-2222-2222-222222222222", "Sigur Ros"),
    ("33333333-3333-3333-3333-333333333333", "Radiohead"),
    ("44444444-4444-4444-4444-444444444444", "Portishead"),
];

fn build_dataset(dir: &Path) -> (SearchConfig, DocumentStore) {
    let artist_file = dir.join("artist.filtered");
    let mut file = File::create(&artist_file).unwrap();
    for (id, name) in ARTISTS {
        writeln!(
            file,
            "{}",
            json!({"id": id, "name": name, "sort-name": name})
        )
        .unwrap();
    }
    drop(file);

    build_artist_fts(&artist_file, &dir.join("artist.db")).unwrap();

    let store = DocumentStore::new(dir);
    for (id, name) in ARTISTS {
        store
            .write(
                DocumentKind::Artist,
                id,
                &json!({"id": id, "artistid": id, "artistname": name}),
            )
            .unwrap();
    }

    let config = SearchConfig::parse_from([
        "mbflat-search",
        "--db-dir",
        dir.to_str().unwrap(),
        "--docs-root",
        dir.to_str().unwrap(),
    ]);
    (config, store)
}

fn run_query(config: &SearchConfig, store: &DocumentStore, query: &str, limit: usize) -> Vec<(String, i64)> {
    let metrics = Metrics::default();
    let token = CancellationToken::new();
    execute_search(config, store, &metrics, &token, query, limit)
        .unwrap()
        .into_iter()
        .map(|result| {
            (
                result.artist["id"].as_str().unwrap().to_string(),
                result.score,
            )
        })
        .collect()
}

#[test]
fn unicode_folding_matches_accented_and_plain_names() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = build_dataset(dir.path());

    let results = run_query(&config, &store, "sigur ros", 10);
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert!(ids.contains(&"11111111-1111-1111-1111-111111111111"));
    assert!(ids.contains(&"22222222-2222-2222-2222-222222222222"));

    // The unaccented spelling matches in more columns and must not rank
    // below the accented one.
    let score_of = |needle: &str| {
        results
            .iter()
            .find(|(id, _)| id == needle)
            .map(|(_, score)| *score)
            .unwrap()
    };
    assert!(
        score_of("22222222-2222-2222-2222-222222222222")
            >= score_of("11111111-1111-1111-1111-111111111111")
    );
}

#[test]
fn exact_name_query_ranks_its_artist_first() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = build_dataset(dir.path());

    let results = run_query(&config, &store, "Radiohead", 10);
    assert!(!results.is_empty());
    let (top_id, top_score) = &results[0];
    assert_eq!(top_id, "33333333-3333-3333-3333-333333333333");
    for (_, score) in &results {
        assert!(top_score >= score);
    }
}

#[test]
fn typo_query_recovers_through_fuzzy_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = build_dataset(dir.path());

    let results = run_query(&config, &store, "radihead", 10);
    let hit = results
        .iter()
        .find(|(id, _)| id == "33333333-3333-3333-3333-333333333333")
        .expect("typo query must recover the artist");
    // Similarity >= 75 minus the fuzzy penalty of 20.
    assert!(hit.1 >= 55, "fuzzy score too low: {}", hit.1);
}

#[test]
fn limit_truncates_after_final_sort() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = build_dataset(dir.path());

    let results = run_query(&config, &store, "sigur ros", 1);
    assert_eq!(results.len(), 1);
}

fn state_with(dir: &Path, extra: &[&str]) -> Arc<AppState> {
    let mut args = vec![
        "mbflat-search".to_string(),
        "--db-dir".to_string(),
        dir.to_str().unwrap().to_string(),
        "--docs-root".to_string(),
        dir.to_str().unwrap().to_string(),
    ];
    args.extend(extra.iter().map(ToString::to_string));
    Arc::new(AppState::new(SearchConfig::parse_from(args)))
}

#[tokio::test]
async fn repeat_query_hits_the_cache_until_ttl() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());
    let state = state_with(dir.path(), &["--cache-ttl-ms", "200"]);

    let key = "client:/search/artists".to_string();
    let first = state
        .search(key.clone(), "Radiohead".into(), 10)
        .await
        .unwrap();
    assert_eq!(state.metrics.snapshot().cache_misses, 1);

    // Identical query (case-insensitive) within the TTL is served from
    // the cache and byte-identical.
    let second = state
        .search(key.clone(), "radiohead".into(), 10)
        .await
        .unwrap();
    assert_eq!(state.metrics.snapshot().cache_hits, 1);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    // Past the TTL the entry misses and repopulates.
    tokio::time::sleep(Duration::from_millis(250)).await;
    state
        .search(key, "radiohead".into(), 10)
        .await
        .unwrap();
    assert_eq!(state.metrics.snapshot().cache_misses, 2);
}

#[tokio::test]
async fn newer_request_supersedes_debouncing_one() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());
    let state = state_with(dir.path(), &["--debounce-ms", "80"]);

    let key = "client:/search/artists".to_string();
    let first = {
        let state = state.clone();
        let key = key.clone();
        tokio::spawn(async move { state.search(key, "Radiohead".into(), 10).await })
    };
    // Let the first request enter its debounce sleep, then supersede it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = state.search(key, "Radiohead".into(), 10).await.unwrap();

    let first = first.await.unwrap().unwrap();
    assert!(first.is_empty(), "superseded request must return empty");
    assert!(!second.is_empty(), "newest request must produce results");
    assert!(state.metrics.snapshot().debounced_cancelled >= 1);
}

#[tokio::test]
async fn search_results_have_null_album_and_full_artist() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());
    let state = state_with(dir.path(), &[]);

    let results = state
        .search("c:/search/artists".into(), "Portishead".into(), 10)
        .await
        .unwrap();
    let value = serde_json::to_value(&results).unwrap();
    assert_eq!(value[0]["album"], serde_json::Value::Null);
    assert_eq!(
        value[0]["artist"]["artistname"].as_str().unwrap(),
        "Portishead"
    );
    assert!(value[0]["score"].as_i64().unwrap() >= 1);
}
