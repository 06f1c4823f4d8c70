//! JSON HTTP server.
//!
//! Serves search, suggestions, and suggestion redirects over the published
//! cache while the [`Scheduler`] keeps it fresh in the background.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?term=` | Ranked results (empty term → first page) |
//! | `GET`  | `/suggest?term=` | OpenSearch suggestions: `[term, [..]]` |
//! | `GET`  | `/redirect?term=` | 301 to the suggestion's URL or a web search |
//! | `GET`  | `/last-updated` | Last successful sync and build version |
//! | `POST` | `/sync` | Start a sync cycle unless one is running |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Query parameter 'term' is missing" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). Requests running
//! longer than `server.request_timeout_secs` are answered with 408.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db;
use crate::error::HistoryError;
use crate::ingest::last_sync_timestamp;
use crate::migrate;
use crate::models::SearchResult;
use crate::scheduler::Scheduler;
use crate::search::{redirect_target, search_history, suggest};
use crate::traits::ConnectorRegistry;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    config: Arc<Config>,
    scheduler: Scheduler,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Arc<Config>, scheduler: Scheduler) -> Self {
        Self {
            pool,
            config,
            scheduler,
        }
    }
}

/// Starts the server with the configured browsers and runs until Ctrl-C
/// or SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let connectors = ConnectorRegistry::from_config(config);
    run_server_with_connectors(config, connectors, shutdown_signal()).await
}

/// Starts the scheduler and the HTTP server; returns once `shutdown`
/// resolves and in-flight requests have drained (or the grace period ran
/// out).
pub async fn run_server_with_connectors<F>(
    config: &Config,
    connectors: ConnectorRegistry,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let config = Arc::new(config.clone());
    let scheduler = Scheduler::new(pool.clone(), config.clone(), connectors);
    let sync_task = scheduler.clone().spawn();

    let app = router(AppState::new(pool.clone(), config.clone(), scheduler));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("PastPath listening on http://{}", listener.local_addr()?);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = stop_tx.send(());
        })
        .into_future();

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let deadline = async move {
        if stop_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => tracing::warn!("shutdown grace period elapsed, dropping open connections"),
    }

    sync_task.abort();
    pool.close().await;
    tracing::info!("Server gracefully stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/suggest", get(handle_suggest))
        .route("/redirect", get(handle_redirect))
        .route("/last-updated", get(handle_last_updated))
        .route("/sync", post(handle_sync))
        .route("/health", get(handle_health))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        tracing::error!(error = %err, "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TermParams {
    term: Option<String>,
}

impl TermParams {
    fn required(self) -> Result<String, AppError> {
        match self.term {
            Some(term) if !term.trim().is_empty() => Ok(term),
            _ => Err(bad_request("Query parameter 'term' is missing")),
        }
    }
}

// ============ GET /search ============

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let term = params.term.unwrap_or_default();
    let results = search_history(&state.pool, &term, state.config.search.result_limit).await?;
    Ok(Json(results))
}

// ============ GET /suggest ============

async fn handle_suggest(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let term = params.required()?;
    let (echo, suggestions) =
        suggest(&state.pool, &term, state.config.search.suggestion_limit).await?;
    Ok(Json(serde_json::json!([echo, suggestions])))
}

// ============ GET /redirect ============

async fn handle_redirect(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
) -> Result<Response, AppError> {
    let term = params.required()?;
    let target = redirect_target(&term, &state.config.search.fallback_search_url);
    let location = HeaderValue::try_from(target)
        .map_err(|_| bad_request("redirect target is not a valid URL"))?;

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}

// ============ GET /last-updated ============

#[derive(Serialize)]
struct LastUpdatedResponse {
    last_timestamp: Option<i64>,
    build_version: String,
}

async fn handle_last_updated(
    State(state): State<AppState>,
) -> Result<Json<LastUpdatedResponse>, AppError> {
    let last_timestamp = last_sync_timestamp(&state.pool).await?;
    Ok(Json(LastUpdatedResponse {
        last_timestamp,
        build_version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

// ============ POST /sync ============

#[derive(Serialize)]
struct SyncResponse {
    status: &'static str,
}

async fn handle_sync(State(state): State<AppState>) -> Json<SyncResponse> {
    if state.scheduler.is_running() {
        return Json(SyncResponse { status: "busy" });
    }

    let scheduler = state.scheduler.clone();
    tokio::spawn(async move { scheduler.run_and_log().await });
    Json(SyncResponse { status: "started" })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
