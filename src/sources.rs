//! Browser source health and status listing.
//!
//! Reports which configured browsers are supported and whether their
//! history database is currently readable. Used by the `pastpath sources`
//! CLI command.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;

/// Health and configuration status of a single configured browser.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    /// Browser family, e.g. `"chrome"` or `"unsupported (safari)"`.
    pub kind: String,
    pub supported: bool,
    /// Supported and the history file exists.
    pub healthy: bool,
    pub notes: Option<String>,
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    config
        .browsers
        .iter()
        .map(|browser| {
            let kind = browser.browser_kind();
            let supported = kind.is_supported();
            let exists = browser.history_db_path.is_file();

            let notes = if !supported {
                Some("skipped during sync".to_string())
            } else if exists {
                Some(format!("path: {}", browser.history_db_path.display()))
            } else {
                Some(format!(
                    "history file not found: {}",
                    browser.history_db_path.display()
                ))
            };

            SourceStatus {
                name: browser.name.clone(),
                kind: kind.to_string(),
                supported,
                healthy: supported && exists,
                notes,
            }
        })
        .collect()
}

/// CLI entry point for `pastpath sources`.
pub fn list_sources(config: &Config) -> Result<()> {
    let sources = get_sources(config);

    if sources.is_empty() {
        println!("No browsers configured. Add [[browsers]] entries to the config file.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:<8} NOTES", "BROWSER", "KIND", "HEALTHY");
    for s in &sources {
        println!(
            "{:<20} {:<24} {:<8} {}",
            s.name,
            s.kind,
            s.healthy,
            s.notes.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_sources_health() {
        let tmp = TempDir::new().unwrap();
        let history = tmp.path().join("History");
        std::fs::write(&history, b"").unwrap();

        let cfg: Config = toml::from_str(&format!(
            r#"
[db]
path = "h.sqlite"

[[browsers]]
name = "Chrome"
kind = "chrome"
history_db_path = "{}"

[[browsers]]
name = "Firefox"
kind = "firefox"
history_db_path = "{}/missing.sqlite"

[[browsers]]
name = "Safari"
kind = "safari"
history_db_path = "{}"
"#,
            history.display(),
            tmp.path().display(),
            history.display()
        ))
        .unwrap();

        let sources = get_sources(&cfg);
        assert_eq!(sources.len(), 3);
        assert!(sources[0].healthy);
        assert!(sources[1].supported && !sources[1].healthy);
        assert!(!sources[2].supported && !sources[2].healthy);
        assert_eq!(sources[2].kind, "unsupported (safari)");
    }
}
