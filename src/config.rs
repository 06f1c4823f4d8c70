use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::BrowserKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browsers: Vec<BrowserConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the rest of the cycle on the first failing browser.
    #[default]
    FailFast,
    /// Keep importing the remaining browsers and report every failure.
    Isolate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            scratch_dir: default_scratch_dir(),
            instance_id: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_interval_secs() -> u64 {
    600
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".tmp")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub replace_http_with_https: bool,
    #[serde(default = "default_result_limit")]
    pub result_limit: i64,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default = "default_fallback_search_url")]
    pub fallback_search_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            replace_http_with_https: true,
            result_limit: default_result_limit(),
            suggestion_limit: default_suggestion_limit(),
            fallback_search_url: default_fallback_search_url(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_result_limit() -> i64 {
    20
}
fn default_suggestion_limit() -> usize {
    5
}
fn default_fallback_search_url() -> String {
    "https://www.google.com/search?q=".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:10000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_shutdown_grace_secs() -> u64 {
    1
}

/// One configured browser history store.
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    pub name: String,
    pub kind: String,
    pub history_db_path: PathBuf,
}

impl BrowserConfig {
    pub fn browser_kind(&self) -> BrowserKind {
        BrowserKind::parse(&self.kind)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.sync.interval_secs == 0 {
        anyhow::bail!("sync.interval_secs must be > 0");
    }

    if !(1..=500).contains(&config.search.result_limit) {
        anyhow::bail!("search.result_limit must be in [1, 500]");
    }

    if config.search.suggestion_limit == 0 {
        anyhow::bail!("search.suggestion_limit must be >= 1");
    }

    if let Some(id) = &config.sync.instance_id {
        if id.trim().is_empty() {
            anyhow::bail!("sync.instance_id must not be blank when set");
        }
    }

    let mut seen = HashSet::new();
    for browser in &config.browsers {
        if browser.name.trim().is_empty() {
            anyhow::bail!("browsers[].name must not be empty");
        }
        if !seen.insert(browser.name.as_str()) {
            anyhow::bail!("Duplicate browser name: '{}'", browser.name);
        }
    }

    Ok(())
}
