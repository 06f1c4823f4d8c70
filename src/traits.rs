//! Connector abstraction over browser history stores.
//!
//! Every supported browser family implements [`HistoryConnector`]. The
//! pipeline never matches on browser kinds itself: it snapshots
//! [`history_path`](HistoryConnector::history_path), hands the copy to
//! [`fetch`](HistoryConnector::fetch), and upserts whatever comes back.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           ConnectorRegistry              │
//! │  ┌─────────┐ ┌─────────┐ ┌────────────┐ │
//! │  │ Chrome  │ │ Firefox │ │  Custom    │ │
//! │  │ family  │ │ family  │ │  (Rust)    │ │
//! │  └─────────┘ └─────────┘ └────────────┘ │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!   snapshot → fetch → upsert → materialize
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pastpath::traits::ConnectorRegistry;
//!
//! let mut connectors = ConnectorRegistry::new();
//! // connectors.register(Box::new(MyConnector::new()));
//! assert!(connectors.is_empty());
//! ```

use async_trait::async_trait;
use sqlx::Row;
use std::path::Path;

use crate::config::Config;
use crate::connector_chrome::ChromeConnector;
use crate::connector_firefox::FirefoxConnector;
use crate::db;
use crate::error::{HistoryError, HistoryResult};
use crate::models::{BrowserKind, RawHistoryEntry};

// ═══════════════════════════════════════════════════════════════════════
// Connector Trait
// ═══════════════════════════════════════════════════════════════════════

/// A browser history source.
///
/// # Lifecycle
///
/// 1. The connector is registered via [`ConnectorRegistry::register`] or
///    built from a `[[browsers]]` entry by [`ConnectorRegistry::from_config`].
/// 2. Each cycle, the pipeline copies [`history_path`](Self::history_path)
///    into the scratch area.
/// 3. [`fetch`](Self::fetch) reads the copy and returns entries whose
///    `last_visit_time` is already in epoch seconds.
#[async_trait]
pub trait HistoryConnector: Send + Sync {
    /// Browser name, used as the `browser` column of every imported row.
    fn name(&self) -> &str;

    /// Browser family.
    fn kind(&self) -> BrowserKind;

    /// Path of the live history database.
    fn history_path(&self) -> &Path;

    /// Read all history rows from a snapshot of [`history_path`](Self::history_path).
    async fn fetch(&self, snapshot: &Path) -> HistoryResult<Vec<RawHistoryEntry>>;
}

/// Runs `query` against a snapshot and converts each row's timestamp.
///
/// `query` must select `url, title, visit_count, last_visit_time` in that
/// order. Any failure (unreadable file, foreign schema) is reported as the
/// source being unavailable.
pub(crate) async fn fetch_entries(
    browser: &str,
    snapshot: &Path,
    query: &str,
    convert_timestamp: fn(i64) -> i64,
) -> HistoryResult<Vec<RawHistoryEntry>> {
    let pool = db::open_snapshot(snapshot)
        .await
        .map_err(|e| HistoryError::from_snapshot_open(browser, snapshot, e))?;

    let rows = sqlx::query(query).fetch_all(&pool).await;
    pool.close().await;
    let rows = rows.map_err(|e| HistoryError::from_snapshot_open(browser, snapshot, e))?;

    let entries = rows
        .iter()
        .map(|row| {
            let visit_count: i64 = row.get(2);
            let last_visit_time: i64 = row.get(3);
            RawHistoryEntry {
                url: row.get(0),
                title: row.get(1),
                visit_count: visit_count.max(0),
                last_visit_time: convert_timestamp(last_visit_time),
            }
        })
        .collect();

    Ok(entries)
}

// ═══════════════════════════════════════════════════════════════════════
// ConnectorRegistry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of connectors imported by one pipeline cycle.
///
/// Order matters: under the fail-fast policy a failing connector skips
/// every connector registered after it.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn HistoryConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the built-in connectors for every `[[browsers]]` entry.
    ///
    /// Unsupported kinds are logged and skipped.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for browser in &config.browsers {
            match browser.browser_kind() {
                BrowserKind::Chrome => registry.register(Box::new(ChromeConnector::new(
                    &browser.name,
                    &browser.history_db_path,
                ))),
                BrowserKind::Firefox => registry.register(Box::new(FirefoxConnector::new(
                    &browser.name,
                    &browser.history_db_path,
                ))),
                BrowserKind::Unsupported(kind) => {
                    let err = HistoryError::UnsupportedSource {
                        name: browser.name.clone(),
                        kind,
                    };
                    tracing::warn!("{}, skipping", err);
                }
            }
        }
        registry
    }

    pub fn register(&mut self, connector: Box<dyn HistoryConnector>) {
        self.connectors.push(connector);
    }

    pub fn connectors(&self) -> &[Box<dyn HistoryConnector>] {
        &self.connectors
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_skips_unsupported() {
        let cfg: Config = toml::from_str(
            r#"
[db]
path = "h.sqlite"

[[browsers]]
name = "Chrome"
kind = "chrome"
history_db_path = "/a"

[[browsers]]
name = "Safari"
kind = "safari"
history_db_path = "/b"

[[browsers]]
name = "Firefox"
kind = "firefox"
history_db_path = "/c"
"#,
        )
        .unwrap();

        let registry = ConnectorRegistry::from_config(&cfg);
        let names: Vec<&str> = registry.connectors().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Chrome", "Firefox"]);
        assert_eq!(registry.connectors()[1].kind(), BrowserKind::Firefox);
    }
}
