//! Search cache materialization.
//!
//! The `history_cache` table is a disposable, denormalized view of
//! `history`: one row per canonical URL with the newest title, summed visit
//! counts, the latest visit time, and lowercased copies of URL and title so
//! queries never fold case per row.
//!
//! # Canonicalization
//!
//! When enabled, an `http://` URL whose `https://` twin exists anywhere in
//! the durable store is folded into the `https://` entry. An `http://` URL
//! without a twin is kept as-is.

use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::HistoryResult;
use crate::models::{CacheEntry, HistoryRecord};

const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";

/// Maps a URL to its canonical form given the set of all stored URLs.
pub fn canonical_url(url: &str, known_urls: &HashSet<&str>) -> String {
    if let Some(rest) = url.strip_prefix(HTTP_PREFIX) {
        let https = format!("{}{}", HTTPS_PREFIX, rest);
        if known_urls.contains(https.as_str()) {
            return https;
        }
    }
    url.to_string()
}

/// Computes the full cache contents from durable records.
///
/// Output is sorted by canonical URL. The title of an entry is the title of
/// the most recently visited row carrying exactly the canonical URL; ties
/// go to the row written last.
pub fn materialize(records: &[HistoryRecord], canonicalize: bool) -> Vec<CacheEntry> {
    let known_urls: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();

    let mut latest: HashMap<&str, &HistoryRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.url.as_str())
            .and_modify(|current| {
                if (record.last_visit_time, record.id) > (current.last_visit_time, current.id) {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    // canonical url -> (visit_count sum, last_visit_time max)
    let mut groups: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for record in records {
        let canonical = if canonicalize {
            canonical_url(&record.url, &known_urls)
        } else {
            record.url.clone()
        };
        let group = groups.entry(canonical).or_insert((0, i64::MIN));
        group.0 = group.0.saturating_add(record.visit_count);
        group.1 = group.1.max(record.last_visit_time);
    }

    groups
        .into_iter()
        .map(|(url, (visit_count, last_visit_time))| {
            let title = latest
                .get(url.as_str())
                .map(|r| r.title.clone())
                .unwrap_or_default();
            CacheEntry {
                url_lower: url.to_lowercase(),
                title_lower: title.to_lowercase(),
                url,
                title,
                last_visit_time,
                visit_count,
            }
        })
        .collect()
}

/// Rebuilds `history_cache` from `history` and returns the entry count.
///
/// Delete and repopulate run in one transaction, so concurrent readers see
/// either the previous generation or the new one.
pub async fn rebuild_cache(pool: &SqlitePool, canonicalize: bool) -> HistoryResult<usize> {
    let records: Vec<HistoryRecord> = sqlx::query_as(
        "SELECT id, url, title, visit_count, last_visit_time, browser, instance_id, url_hash FROM history ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let entries = materialize(&records, canonicalize);

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM history_cache")
        .execute(&mut *tx)
        .await?;

    for entry in &entries {
        sqlx::query(
            r#"
            INSERT INTO history_cache (url, url_lower, title, title_lower, visit_count, last_visit_time)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.url)
        .bind(&entry.url_lower)
        .bind(&entry.title)
        .bind(&entry.title_lower)
        .bind(entry.visit_count)
        .bind(entry.last_visit_time)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("REINDEX history_cache").execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::debug!(entries = entries.len(), source_rows = records.len(), "cache rebuilt");
    Ok(entries.len())
}

/// Reads the whole published cache, ordered by URL.
pub async fn load_cache(pool: &SqlitePool) -> HistoryResult<Vec<CacheEntry>> {
    let entries = sqlx::query_as(
        "SELECT url, url_lower, title, title_lower, last_visit_time, visit_count FROM history_cache ORDER BY url",
    )
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, url: &str, title: &str, visits: i64, ts: i64, browser: &str) -> HistoryRecord {
        HistoryRecord {
            id,
            url: url.to_string(),
            title: title.to_string(),
            visit_count: visits,
            last_visit_time: ts,
            browser: browser.to_string(),
            instance_id: "i1".to_string(),
            url_hash: crate::ingest::content_key(url),
        }
    }

    #[test]
    fn test_http_https_pair_collapses() {
        let records = vec![
            record(1, "http://x/a", "Plain", 2, 50, "Chrome"),
            record(2, "https://x/a", "Secure", 3, 40, "Chrome"),
        ];
        let entries = materialize(&records, true);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://x/a");
        assert_eq!(entries[0].visit_count, 5);
        assert_eq!(entries[0].last_visit_time, 50);
        // Title comes from the canonical URL's own rows
        assert_eq!(entries[0].title, "Secure");
    }

    #[test]
    fn test_http_without_twin_passes_through() {
        let records = vec![
            record(1, "http://only-http.org/", "Legacy", 1, 10, "Chrome"),
            record(2, "https://other.org/", "Other", 1, 10, "Chrome"),
        ];
        let entries = materialize(&records, true);
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["http://only-http.org/", "https://other.org/"]);
    }

    #[test]
    fn test_canonicalization_disabled_keeps_both() {
        let records = vec![
            record(1, "http://x/a", "Plain", 2, 50, "Chrome"),
            record(2, "https://x/a", "Secure", 3, 40, "Chrome"),
        ];
        let entries = materialize(&records, false);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_same_url_across_browsers_sums_and_picks_latest_title() {
        let records = vec![
            record(1, "https://news.site/", "Morning News", 4, 100, "Chrome"),
            record(2, "https://news.site/", "Evening News", 6, 300, "Firefox"),
            record(3, "https://news.site/", "Noon News", 1, 200, "Brave"),
        ];
        let entries = materialize(&records, true);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Evening News");
        assert_eq!(entries[0].title_lower, "evening news");
        assert_eq!(entries[0].visit_count, 11);
        assert_eq!(entries[0].last_visit_time, 300);
    }

    #[test]
    fn test_title_tie_goes_to_latest_row() {
        let records = vec![
            record(1, "https://a.com", "First", 1, 100, "Chrome"),
            record(2, "https://a.com", "Second", 1, 100, "Firefox"),
        ];
        let entries = materialize(&records, true);
        assert_eq!(entries[0].title, "Second");
    }

    #[test]
    fn test_case_folded_columns() {
        let records = vec![record(1, "https://Example.COM/Ünï", "Grüße AUS Köln", 1, 1, "Chrome")];
        let entries = materialize(&records, true);
        assert_eq!(entries[0].url_lower, "https://example.com/ünï");
        assert_eq!(entries[0].title_lower, "grüße aus köln");
    }

    #[test]
    fn test_materialize_is_deterministic() {
        let records = vec![
            record(1, "https://b.com", "B", 1, 1, "Chrome"),
            record(2, "http://a.com", "A", 1, 1, "Chrome"),
            record(3, "https://a.com", "A2", 1, 2, "Firefox"),
        ];
        assert_eq!(materialize(&records, true), materialize(&records, true));
    }
}
