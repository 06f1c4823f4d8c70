//! # PastPath
//!
//! Local browser-history unification and search.
//!
//! PastPath periodically snapshots the history databases of the installed
//! browsers (Chrome and Firefox families), merges them into one store keyed
//! by URL, browser, and instance, and publishes a deduplicated search cache.
//! The cache is queried from the CLI or through a small HTTP server that
//! also speaks the OpenSearch suggestion format.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐   ┌───────────────┐
//! │ Connectors  │──▶│  Snapshot   │──▶│  Upsert  │──▶│ history_cache │
//! │ Chrome/FF   │   │ scratch dir │   │ history  │   │  (rebuilt)    │
//! └─────────────┘   └─────────────┘   └──────────┘   └───────┬───────┘
//!                                                            │
//!                                        ┌───────────────────┤
//!                                        ▼                   ▼
//!                                   ┌──────────┐       ┌──────────┐
//!                                   │   CLI    │       │   HTTP   │
//!                                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pastpath init                    # create database
//! pastpath sources                 # check configured browsers
//! pastpath sync                    # run one cycle
//! pastpath search "rust async"
//! pastpath serve                   # HTTP server + periodic sync
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error type |
//! | [`timestamp`] | Browser epoch normalization |
//! | [`traits`] | Connector trait and registry |
//! | [`connector_chrome`] | Chrome-family history reader |
//! | [`connector_firefox`] | Firefox-family history reader |
//! | [`snapshot`] | Scratch copies of live databases |
//! | [`ingest`] | Cycle orchestration and upsert |
//! | [`cache`] | Search cache materialization |
//! | [`search`] | Search, suggestions, and redirects |
//! | [`scheduler`] | Periodic, non-overlapping cycles |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |

pub mod cache;
pub mod config;
pub mod connector_chrome;
pub mod connector_firefox;
pub mod db;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod sources;
pub mod stats;
pub mod timestamp;
pub mod traits;
