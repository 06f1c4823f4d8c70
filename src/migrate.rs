use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index. Idempotent; the pipeline calls it at the
/// start of each cycle so a fresh database needs no separate `init`.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Durable history, one row per (url, browser, instance)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            visit_count INTEGER NOT NULL DEFAULT 0,
            last_visit_time INTEGER NOT NULL DEFAULT 0,
            browser TEXT NOT NULL,
            instance_id TEXT NOT NULL,
            url_hash TEXT NOT NULL,
            UNIQUE(url_hash, browser, instance_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Materialized search cache, rebuilt wholesale every cycle
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history_cache (
            url TEXT PRIMARY KEY,
            url_lower TEXT NOT NULL,
            title TEXT NOT NULL,
            title_lower TEXT NOT NULL,
            visit_count INTEGER NOT NULL,
            last_visit_time INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only audit trail of completed imports
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS last_run (
            instance TEXT NOT NULL,
            browser TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_url_last_visit_time ON history(url, last_visit_time)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_cache_title_lower ON history_cache(title_lower)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_cache_url_lower ON history_cache(url_lower)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_last_run_timestamp ON last_run(timestamp DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns the persisted instance id, generating and storing one on first
/// use. A configured id always wins and is never written to the table.
pub async fn resolve_instance_id(
    pool: &SqlitePool,
    configured: Option<&str>,
) -> Result<String, sqlx::Error> {
    if let Some(id) = configured {
        return Ok(id.to_string());
    }

    let candidate = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO meta (key, value) VALUES ('instance_id', ?) ON CONFLICT(key) DO NOTHING")
        .bind(&candidate)
        .execute(pool)
        .await?;

    sqlx::query_scalar("SELECT value FROM meta WHERE key = 'instance_id'")
        .fetch_one(pool)
        .await
}
