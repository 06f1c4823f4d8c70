//! Core data models used throughout PastPath.
//!
//! These types represent the history rows, durable records, cache entries,
//! and search results that flow through the ingestion and query pipeline.

use serde::Serialize;
use std::fmt;

/// Browser family a configured history store belongs to.
///
/// Families share a schema and a timestamp encoding, so e.g. Brave and Edge
/// are read exactly like Chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Unsupported(String),
}

impl BrowserKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" | "brave" | "edge" | "vivaldi" | "opera" => BrowserKind::Chrome,
            "firefox" | "librewolf" | "waterfox" | "zen" => BrowserKind::Firefox,
            _ => BrowserKind::Unsupported(kind.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, BrowserKind::Unsupported(_))
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Firefox => write!(f, "firefox"),
            BrowserKind::Unsupported(kind) => write!(f, "unsupported ({})", kind),
        }
    }
}

/// Raw row read from a browser's history database.
///
/// `last_visit_time` is already converted to epoch seconds by the
/// connector that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHistoryEntry {
    pub url: String,
    pub title: String,
    pub visit_count: i64,
    pub last_visit_time: i64,
}

/// Durable history row stored in SQLite.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HistoryRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub visit_count: i64,
    pub last_visit_time: i64,
    pub browser: String,
    pub instance_id: String,
    pub url_hash: String,
}

/// Append-only record of a completed per-browser import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RunMarker {
    pub instance: String,
    pub browser: String,
    pub timestamp: i64,
}

/// One row of the materialized search cache.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CacheEntry {
    pub url: String,
    pub url_lower: String,
    pub title: String,
    pub title_lower: String,
    pub last_visit_time: i64,
    pub visit_count: i64,
}

/// A search result returned from the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub last_visit_time: i64,
    pub visit_count: i64,
}
