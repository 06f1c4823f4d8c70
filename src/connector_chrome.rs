//! Chrome-family history connector.
//!
//! Reads the `urls` table of a Chromium `History` database (Chrome,
//! Chromium, Brave, Edge, Vivaldi, Opera).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::HistoryResult;
use crate::models::{BrowserKind, RawHistoryEntry};
use crate::timestamp::chrome_to_unix;
use crate::traits::{fetch_entries, HistoryConnector};

const CHROME_HISTORY_QUERY: &str = r#"
    SELECT url, COALESCE(title, '') AS title, visit_count, last_visit_time
    FROM urls
    WHERE url IS NOT NULL
    ORDER BY last_visit_time DESC
"#;

pub struct ChromeConnector {
    name: String,
    path: PathBuf,
}

impl ChromeConnector {
    pub fn new(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl HistoryConnector for ChromeConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BrowserKind {
        BrowserKind::Chrome
    }

    fn history_path(&self) -> &Path {
        &self.path
    }

    async fn fetch(&self, snapshot: &Path) -> HistoryResult<Vec<RawHistoryEntry>> {
        fetch_entries(&self.name, snapshot, CHROME_HISTORY_QUERY, chrome_to_unix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    async fn write_chrome_db(path: &Path, rows: &[(&str, Option<&str>, i64, i64)]) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE urls (id INTEGER PRIMARY KEY, url LONGVARCHAR, title LONGVARCHAR, visit_count INTEGER DEFAULT 0 NOT NULL, typed_count INTEGER DEFAULT 0 NOT NULL, last_visit_time INTEGER NOT NULL, hidden INTEGER DEFAULT 0 NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (url, title, visits, ts) in rows {
            sqlx::query("INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?, ?, ?, ?)")
                .bind(url)
                .bind(title)
                .bind(visits)
                .bind(ts)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;
    }

    #[tokio::test]
    async fn test_fetch_converts_timestamps_and_null_titles() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("History");
        write_chrome_db(
            &db_path,
            &[
                ("https://a.com", Some("A"), 3, 11_644_473_600_000_000),
                ("https://b.com", None, 1, 11_644_473_610_000_000),
            ],
        )
        .await;

        let connector = ChromeConnector::new("Chrome", &db_path);
        let entries = connector.fetch(&db_path).await.unwrap();

        assert_eq!(entries.len(), 2);
        // Most recent first
        assert_eq!(entries[0].url, "https://b.com");
        assert_eq!(entries[0].title, "");
        assert_eq!(entries[0].last_visit_time, 10);
        assert_eq!(entries[1].last_visit_time, 0);
        assert_eq!(entries[1].visit_count, 3);
    }

    #[tokio::test]
    async fn test_fetch_foreign_schema_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("places.sqlite");
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE moz_places (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let connector = ChromeConnector::new("Chrome", &db_path);
        let err = connector.fetch(&db_path).await.unwrap_err();
        assert!(matches!(err, HistoryError::SourceUnavailable { .. }));
    }
}
