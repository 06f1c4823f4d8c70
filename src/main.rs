//! # PastPath CLI (`pastpath`)
//!
//! Commands for database setup, one-off sync cycles, searching the unified
//! history, and running the HTTP server with periodic sync.
//!
//! ## Usage
//!
//! ```bash
//! pastpath --config ./config/pastpath.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pastpath init` | Create the SQLite database and schema |
//! | `pastpath sources` | List configured browsers and their health |
//! | `pastpath sync` | Run one ingest-and-materialize cycle |
//! | `pastpath search "<phrase>"` | Search the unified history |
//! | `pastpath suggest "<phrase>"` | Print OpenSearch-style suggestions |
//! | `pastpath resolve "<text>"` | Print the URL a suggestion redirects to |
//! | `pastpath status` | Record counts and last sync |
//! | `pastpath serve` | Start the HTTP server and the sync scheduler |
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pastpath::{config, db, ingest, migrate, search, server, sources, stats};

/// PastPath: unified, searchable browser history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pastpath.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pastpath",
    about = "PastPath: unified, searchable browser history",
    version,
    long_about = "PastPath snapshots the history databases of your browsers, merges them into \
    one local SQLite store, and serves fast substring search and search-box suggestions \
    from a CLI and a small HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pastpath.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// List configured browsers and whether their history is readable.
    Sources,

    /// Run one sync cycle: snapshot, import, and rebuild the search cache.
    Sync,

    /// Search the unified history.
    Search {
        /// Whitespace-separated terms; every term must match the title or URL.
        phrase: String,

        /// Maximum number of results (defaults to `search.result_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print suggestions in the OpenSearch JSON format.
    Suggest {
        phrase: String,
    },

    /// Print the URL a suggestion (or free text) redirects to.
    Resolve {
        text: String,
    },

    /// Show record counts and last sync per browser.
    Status,

    /// Start the HTTP server and the background sync scheduler.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Sync => {
            let report = ingest::run_pipeline_once(&cfg).await?;
            for import in &report.imports {
                println!("{:<20} {} entries", import.browser, import.entries);
            }
            println!(
                "Sync complete (instance {}): {} cached URLs",
                report.instance_id, report.cache_entries
            );
        }
        Commands::Search { phrase, limit } => {
            let pool = db::connect(&cfg).await?;
            migrate::ensure_schema(&pool).await?;
            let limit = limit.unwrap_or(cfg.search.result_limit);
            search::run_search(&pool, &phrase, limit).await?;
            pool.close().await;
        }
        Commands::Suggest { phrase } => {
            let pool = db::connect(&cfg).await?;
            migrate::ensure_schema(&pool).await?;
            let (echo, suggestions) =
                search::suggest(&pool, &phrase, cfg.search.suggestion_limit).await?;
            println!("{}", serde_json::json!([echo, suggestions]));
            pool.close().await;
        }
        Commands::Resolve { text } => {
            println!(
                "{}",
                search::redirect_target(&text, &cfg.search.fallback_search_url)
            );
        }
        Commands::Status => {
            let pool = db::connect(&cfg).await?;
            migrate::ensure_schema(&pool).await?;
            stats::run_status(&cfg, &pool).await?;
            pool.close().await;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
