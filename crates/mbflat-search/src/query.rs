//! Ranking and fuzzy-fallback engine.
//!
//! This is the blocking half of a search request, run off the async
//! runtime. It executes the FTS lookup ordered by BM25, hydrates each
//! candidate from the document store, applies exact/prefix/word/suffix
//! boosts on folded names, and falls back to edit-distance plus phonetic
//! matching when the index returns too few candidates.
//!
//! The cancellation token is observed at every loop boundary, between the
//! FTS and fuzzy phases, and inside SQLite through the progress handler.

use std::collections::HashSet;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mbflat_store::{DocumentKind, DocumentStore};

use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::metrics::Metrics;
use crate::text::{fold, match_expression};

/// Below this many FTS results the fuzzy fallback is considered.
const FUZZY_RESULT_THRESHOLD: usize = 20;

/// Candidate cap for the fuzzy fallback scan.
const FUZZY_CANDIDATE_CAP: usize = 500;

/// Minimum similarity (0–100) for a fuzzy hit to survive.
const SIMILARITY_FLOOR: f64 = 75.0;

/// Score penalty applied to fuzzy hits relative to their similarity.
const FUZZY_PENALTY: f64 = 20.0;

/// Similarity bonus when the phonetic code matches, clamped at 100.
const PHONETIC_BONUS: f64 = 15.0;

/// SQLite progress-handler granularity in VDBE steps.
const PROGRESS_STEPS: i32 = 1000;

/// One search hit: the full artist document, no album, and a rank score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The normalized artist document, loaded from the sharded store.
    pub artist: serde_json::Value,
    /// Always `null` for artist search.
    pub album: Option<serde_json::Value>,
    /// Final rank score; higher is better.
    pub score: i64,
}

struct FtsCandidate {
    id: String,
    name: String,
    rank: f64,
}

struct FuzzyHit {
    id: String,
    similarity: f64,
}

/// Execute a search against the artist index and document store.
///
/// Returns at most `limit` results sorted by score descending. The query
/// is assumed to have passed the minimum-length gate already.
pub fn execute_search(
    config: &SearchConfig,
    store: &DocumentStore,
    metrics: &Metrics,
    token: &CancellationToken,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    let db_path = config.artist_db();
    if !db_path.exists() {
        return Err(SearchError::IndexUnavailable(db_path));
    }

    let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    {
        let token = token.clone();
        conn.progress_handler(PROGRESS_STEPS, Some(move || token.is_cancelled()));
    }

    let trimmed = query.trim();
    let folded_query = fold(trimmed);
    let mut results: Vec<SearchResult> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // FTS phase, ordered by BM25 (lower rank is better).
    if let Some(expression) = match_expression(trimmed) {
        let inner_limit = config.inner_limit(limit);
        let candidates = fts_candidates(&conn, &expression, inner_limit)?;
        debug!("FTS returned {} candidates for '{trimmed}'", candidates.len());

        for candidate in candidates {
            if token.is_cancelled() {
                metrics.incr(&metrics.cancelled_during_processing);
                break;
            }
            let Some(artist) = load_artist(store, &candidate.id) else {
                continue;
            };
            let base = (100.0 - candidate.rank).round().max(1.0) as i64;
            let boost = name_boost(&folded_query, &fold(&candidate.name));
            seen.insert(candidate.id);
            results.push(SearchResult {
                artist,
                album: None,
                score: base + boost,
            });
        }
    }

    // Fuzzy fallback when the index came back thin.
    if results.len() < FUZZY_RESULT_THRESHOLD && !token.is_cancelled() {
        if trimmed.chars().count() >= config.fuzzy_min_len {
            metrics.incr(&metrics.fuzzy_invocations);
            for hit in fuzzy_candidates(&conn, &folded_query)? {
                if token.is_cancelled() {
                    metrics.incr(&metrics.cancelled_during_processing);
                    break;
                }
                if seen.contains(&hit.id) {
                    continue;
                }
                let Some(artist) = load_artist(store, &hit.id) else {
                    continue;
                };
                let score = (hit.similarity - FUZZY_PENALTY).round().max(1.0) as i64;
                seen.insert(hit.id);
                results.push(SearchResult {
                    artist,
                    album: None,
                    score,
                });
            }
        } else {
            metrics.incr(&metrics.fuzzy_skipped_short);
        }
    }

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(limit);
    Ok(results)
}

/// Exact / prefix / word-contains / suffix boost on folded forms.
///
/// A trailing word is also a contained word once both operands are
/// space-padded, so the word-contains tier absorbs suffix matches and the
/// suffix tier never fires; the tier order matches the scoring table.
fn name_boost(folded_query: &str, folded_name: &str) -> i64 {
    if folded_name == folded_query {
        50
    } else if folded_name.starts_with(&format!("{folded_query} ")) {
        30
    } else if format!(" {folded_name} ").contains(&format!(" {folded_query} ")) {
        20
    } else if folded_name.ends_with(&format!(" {folded_query}")) {
        10
    } else {
        0
    }
}

fn fts_candidates(conn: &Connection, expression: &str, limit: usize) -> Result<Vec<FtsCandidate>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, bm25(artists_fts) AS rank
         FROM artists_fts
         WHERE artists_fts MATCH ?1
         ORDER BY rank
         LIMIT ?2",
    )?;
    let mut rows = stmt.query(rusqlite::params![expression, limit as i64])?;

    let mut candidates = Vec::new();
    loop {
        match rows.next() {
            Ok(Some(row)) => candidates.push(FtsCandidate {
                id: row.get(0)?,
                name: row.get(1)?,
                rank: row.get(2)?,
            }),
            Ok(None) => break,
            Err(err) if is_interrupted(&err) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(candidates)
}

/// Select fuzzy candidates and score them by edit-distance ratio.
///
/// Candidates contain the query's first token in their folded name or
/// share its phonetic primary code. Hits below the similarity floor are
/// dropped; survivors come back sorted by similarity descending.
fn fuzzy_candidates(conn: &Connection, folded_query: &str) -> Result<Vec<FuzzyHit>> {
    let Some(anchor) = folded_query.split_whitespace().next() else {
        return Ok(Vec::new());
    };
    let (query_phonetic, _) = crate::text::phonetic_codes(folded_query);

    let mut stmt = conn.prepare(
        "SELECT id, folded_name, phonetic_primary, phonetic_secondary
         FROM artists_fts
         WHERE folded_name LIKE ?1
            OR (?2 <> '' AND (phonetic_primary = ?2 OR phonetic_secondary = ?2))
         LIMIT ?3",
    )?;
    let mut rows = stmt.query(rusqlite::params![
        format!("%{anchor}%"),
        query_phonetic,
        FUZZY_CANDIDATE_CAP as i64
    ])?;

    let mut hits = Vec::new();
    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(err) if is_interrupted(&err) => break,
            Err(err) => return Err(err.into()),
        };
        let id: String = row.get(0)?;
        let folded_name: String = row.get(1)?;
        let primary: String = row.get(2)?;
        let secondary: String = row.get(3)?;

        let mut similarity = strsim::normalized_levenshtein(folded_query, &folded_name) * 100.0;
        let phonetic_match =
            !query_phonetic.is_empty() && (primary == query_phonetic || secondary == query_phonetic);
        if phonetic_match {
            similarity = (similarity + PHONETIC_BONUS).min(100.0);
        }

        if similarity >= SIMILARITY_FLOOR {
            hits.push(FuzzyHit { id, similarity });
        }
    }

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    debug!("Fuzzy fallback kept {} candidates", hits.len());
    Ok(hits)
}

fn load_artist(store: &DocumentStore, mbid: &str) -> Option<serde_json::Value> {
    match store.read_value(DocumentKind::Artist, mbid) {
        Ok(artist) => Some(artist),
        Err(err) => {
            warn!("Could not load artist {mbid}: {err}");
            None
        }
    }
}

fn is_interrupted(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::OperationInterrupted
    )
}
