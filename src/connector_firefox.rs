//! Firefox-family history connector.
//!
//! Reads `moz_places` from a `places.sqlite` database. Places that were
//! bookmarked but never visited have a NULL `last_visit_date`; they are
//! imported with a zero timestamp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::HistoryResult;
use crate::models::{BrowserKind, RawHistoryEntry};
use crate::timestamp::firefox_to_unix;
use crate::traits::{fetch_entries, HistoryConnector};

const FIREFOX_HISTORY_QUERY: &str = r#"
    SELECT url,
           COALESCE(title, '') AS title,
           visit_count,
           COALESCE(last_visit_date, 0) AS last_visit_date
    FROM moz_places
    WHERE url IS NOT NULL
    ORDER BY last_visit_date DESC
"#;

pub struct FirefoxConnector {
    name: String,
    path: PathBuf,
}

impl FirefoxConnector {
    pub fn new(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl HistoryConnector for FirefoxConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BrowserKind {
        BrowserKind::Firefox
    }

    fn history_path(&self) -> &Path {
        &self.path
    }

    async fn fetch(&self, snapshot: &Path) -> HistoryResult<Vec<RawHistoryEntry>> {
        fetch_entries(&self.name, snapshot, FIREFOX_HISTORY_QUERY, firefox_to_unix).await
    }
}
