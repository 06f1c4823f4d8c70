//! Database statistics and sync overview.
//!
//! Summarizes what has been imported: record and cache counts, the last
//! successful sync, and a per-browser breakdown. Used by `pastpath status`.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::ingest::{last_sync_timestamp, recent_runs};
use crate::models::RunMarker;

/// Per-browser record counts and last completed import.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserStats {
    pub browser: String,
    pub instance_id: String,
    pub records: i64,
    pub last_sync_ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub records: i64,
    pub cache_entries: i64,
    pub last_sync_ts: Option<i64>,
    pub browsers: Vec<BrowserStats>,
    pub recent_runs: Vec<RunMarker>,
}

pub async fn get_stats(pool: &SqlitePool) -> Result<Stats> {
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
        .fetch_one(pool)
        .await?;

    let cache_entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history_cache")
        .fetch_one(pool)
        .await?;

    let last_sync_ts = last_sync_timestamp(pool).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            h.browser,
            h.instance_id,
            COUNT(*) AS records,
            (SELECT MAX(r.timestamp) FROM last_run r
             WHERE r.browser = h.browser AND r.instance = h.instance_id) AS last_sync_ts
        FROM history h
        GROUP BY h.browser, h.instance_id
        ORDER BY records DESC, h.browser ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let browsers = rows
        .iter()
        .map(|row| BrowserStats {
            browser: row.get("browser"),
            instance_id: row.get("instance_id"),
            records: row.get("records"),
            last_sync_ts: row.get("last_sync_ts"),
        })
        .collect();

    let recent_runs = recent_runs(pool, 5).await?;

    Ok(Stats {
        records,
        cache_entries,
        last_sync_ts,
        browsers,
        recent_runs,
    })
}

/// Run the status command: query the database and print a summary.
pub async fn run_status(config: &Config, pool: &SqlitePool) -> Result<()> {
    let stats = get_stats(pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("PastPath Database Status");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Last sync:   {}", format_last_sync(stats.last_sync_ts));
    println!();
    println!("  Records:     {}", stats.records);
    println!("  Cached URLs: {}", stats.cache_entries);

    if !stats.browsers.is_empty() {
        println!();
        println!("  By browser:");
        println!(
            "  {:<20} {:<38} {:>8}   LAST SYNC",
            "BROWSER", "INSTANCE", "RECORDS"
        );
        println!("  {}", "-".repeat(84));
        for b in &stats.browsers {
            println!(
                "  {:<20} {:<38} {:>8}   {}",
                b.browser,
                b.instance_id,
                b.records,
                format_last_sync(b.last_sync_ts)
            );
        }
    }

    if !stats.recent_runs.is_empty() {
        println!();
        println!("  Recent imports:");
        for run in &stats.recent_runs {
            println!(
                "    {}  {} ({})",
                crate::timestamp::format_epoch(run.timestamp),
                run.browser,
                run.instance
            );
        }
    }

    println!();
    Ok(())
}

fn format_last_sync(ts: Option<i64>) -> String {
    match ts {
        Some(ts) => format_ts_relative(ts),
        None => "never".to_string(),
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return crate::timestamp::format_epoch(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        crate::timestamp::format_epoch(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_last_sync() {
        assert_eq!(format_last_sync(None), "never");
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_last_sync(Some(now)), "just now");
        assert_eq!(format_last_sync(Some(now - 7200)), "2 hours ago");
    }
}
