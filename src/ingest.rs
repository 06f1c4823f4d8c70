//! Ingestion pipeline orchestration.
//!
//! Coordinates one full cycle: snapshot → fetch → upsert for every
//! configured browser, then a cache rebuild. Each browser's batch commits
//! as one transaction; what happens after a failing browser is governed by
//! [`FailurePolicy`].

use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::cache;
use crate::config::{Config, FailurePolicy};
use crate::db;
use crate::error::{HistoryError, HistoryResult};
use crate::migrate;
use crate::models::{RawHistoryEntry, RunMarker};
use crate::snapshot::ScratchDir;
use crate::traits::{ConnectorRegistry, HistoryConnector};

/// Outcome of one successful browser import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserImport {
    pub browser: String,
    pub entries: usize,
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub instance_id: String,
    pub imports: Vec<BrowserImport>,
    pub cache_entries: usize,
}

/// Connects to the configured database and runs one cycle over the
/// browsers listed in the config.
pub async fn run_pipeline_once(config: &Config) -> Result<CycleReport> {
    let pool = db::connect(config).await?;
    let connectors = ConnectorRegistry::from_config(config);
    let result = run_cycle(&pool, config, &connectors).await;
    pool.close().await;
    Ok(result?)
}

/// Runs one ingest-then-materialize cycle.
///
/// The cache is rebuilt even when ingestion stopped early, so batches that
/// did commit become searchable; the ingestion error is still returned.
pub async fn run_cycle(
    pool: &SqlitePool,
    config: &Config,
    connectors: &ConnectorRegistry,
) -> HistoryResult<CycleReport> {
    tracing::info!("Processing browser history");
    migrate::ensure_schema(pool).await?;
    let instance_id =
        migrate::resolve_instance_id(pool, config.sync.instance_id.as_deref()).await?;

    let mut report = CycleReport {
        instance_id: instance_id.clone(),
        ..Default::default()
    };
    let mut failures: Vec<(String, HistoryError)> = Vec::new();

    {
        let scratch = ScratchDir::create(&config.sync.scratch_dir)?;

        for connector in connectors.connectors() {
            match import_browser(pool, &scratch, connector.as_ref(), &instance_id).await {
                Ok(entries) => report.imports.push(BrowserImport {
                    browser: connector.name().to_string(),
                    entries,
                }),
                Err(err) => {
                    tracing::error!(browser = connector.name(), error = %err, "browser import failed");
                    failures.push((connector.name().to_string(), err));
                    if config.sync.failure_policy == FailurePolicy::FailFast {
                        tracing::warn!("aborting remaining browsers for this cycle");
                        break;
                    }
                }
            }
        }
        // scratch dropped here: snapshots are removed before the rebuild
    }

    let rebuilt = cache::rebuild_cache(pool, config.search.replace_http_with_https).await;

    if let Some(err) = into_cycle_error(failures) {
        if let Err(rebuild_err) = rebuilt {
            tracing::error!(error = %rebuild_err, "cache rebuild failed after aborted ingestion");
        }
        return Err(err);
    }

    report.cache_entries = rebuilt?;
    tracing::info!(
        browsers = report.imports.len(),
        cache_entries = report.cache_entries,
        "Finished processing browser history"
    );
    Ok(report)
}

/// A single failure is returned as-is; several are aggregated.
fn into_cycle_error(mut failures: Vec<(String, HistoryError)>) -> Option<HistoryError> {
    match failures.len() {
        0 => None,
        1 => failures.pop().map(|(_, err)| err),
        _ => Some(HistoryError::CycleFailed {
            failed: failures.into_iter().map(|(name, _)| name).collect(),
        }),
    }
}

async fn import_browser(
    pool: &SqlitePool,
    scratch: &ScratchDir,
    connector: &dyn HistoryConnector,
    instance_id: &str,
) -> HistoryResult<usize> {
    let name = connector.name();
    let snapshot = scratch.snapshot(name, connector.history_path()).await?;
    tracing::info!(browser = name, path = %snapshot.display(), "Processing browser");

    let entries = connector.fetch(&snapshot).await?;
    tracing::info!(browser = name, entries = entries.len(), "Found entries");

    upsert_entries(pool, &entries, name, instance_id).await?;
    insert_run_marker(pool, name, instance_id).await?;

    Ok(entries.len())
}

/// SHA-256 of the raw URL, hex encoded.
pub fn content_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Inserts or updates every entry under (content key, browser, instance).
///
/// All rows commit together; any failure rolls back the whole batch.
pub async fn upsert_entries(
    pool: &SqlitePool,
    entries: &[RawHistoryEntry],
    browser: &str,
    instance_id: &str,
) -> HistoryResult<()> {
    tracing::debug!(browser, "Starting merge");
    let mut tx = pool.begin().await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO history (url, title, visit_count, last_visit_time, browser, instance_id, url_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url_hash, browser, instance_id) DO UPDATE SET
                title = excluded.title,
                visit_count = excluded.visit_count,
                last_visit_time = excluded.last_visit_time
            "#,
        )
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(entry.visit_count)
        .bind(entry.last_visit_time)
        .bind(browser)
        .bind(instance_id)
        .bind(content_key(&entry.url))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(browser, "Done merging");
    Ok(())
}

pub async fn insert_run_marker(
    pool: &SqlitePool,
    browser: &str,
    instance_id: &str,
) -> HistoryResult<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("INSERT INTO last_run (instance, browser, timestamp) VALUES (?, ?, ?)")
        .bind(instance_id)
        .bind(browser)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

/// Completion time of the most recent successful browser import.
pub async fn last_sync_timestamp(pool: &SqlitePool) -> HistoryResult<Option<i64>> {
    let ts: Option<i64> = sqlx::query_scalar("SELECT MAX(timestamp) FROM last_run")
        .fetch_one(pool)
        .await?;
    Ok(ts)
}

/// Most recent run markers, newest first.
pub async fn recent_runs(pool: &SqlitePool, limit: i64) -> HistoryResult<Vec<RunMarker>> {
    let runs = sqlx::query_as(
        "SELECT instance, browser, timestamp FROM last_run ORDER BY timestamp DESC, rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(runs)
}
