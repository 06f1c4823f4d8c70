//! Periodic pipeline runner.
//!
//! [`Scheduler`] owns everything a cycle needs (pool, config, connectors)
//! and guarantees that at most one cycle is in flight. Ticks and manual
//! triggers that arrive while a cycle is running are dropped, not queued.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::error::HistoryResult;
use crate::ingest::{run_cycle, CycleReport};
use crate::traits::ConnectorRegistry;

/// Cheap to clone; clones share the same in-flight guard.
#[derive(Clone)]
pub struct Scheduler {
    pool: SqlitePool,
    config: Arc<Config>,
    connectors: Arc<ConnectorRegistry>,
    interval: Duration,
    in_flight: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(pool: SqlitePool, config: Arc<Config>, connectors: ConnectorRegistry) -> Self {
        let interval = Duration::from_secs(config.sync.interval_secs);
        Self {
            pool,
            config,
            connectors: Arc::new(connectors),
            interval,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Runs one cycle now, or returns `None` if a cycle is already running.
    pub async fn run_once(&self) -> Option<HistoryResult<CycleReport>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("sync cycle already in progress, skipping");
            return None;
        };
        Some(run_cycle(&self.pool, &self.config, &self.connectors).await)
    }

    /// Runs one cycle and logs its outcome. Failures never propagate.
    pub async fn run_and_log(&self) {
        match self.run_once().await {
            Some(Ok(report)) => tracing::info!(
                instance = %report.instance_id,
                browsers = report.imports.len(),
                cache_entries = report.cache_entries,
                "sync cycle completed"
            ),
            Some(Err(err)) => tracing::error!(error = %err, "sync cycle failed, retrying next tick"),
            None => {}
        }
    }

    /// Spawns the background loop: one cycle immediately, then one per
    /// interval. Missed ticks are skipped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.run_and_log().await;
            }
        })
    }
}
