//! Scratch-area snapshots of live browser databases.
//!
//! Browsers keep their history databases open and locked while running, so
//! every import reads from a private copy. A [`ScratchDir`] owns one cycle's
//! copies and removes them when dropped, whether the cycle succeeded or not.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{HistoryError, HistoryResult};

/// Per-cycle scratch directory, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates a fresh, uniquely named directory under `root`.
    ///
    /// Only this subdirectory is ever removed, so pointing `scratch_dir` at
    /// a directory that holds other files is safe.
    pub fn create(root: &Path) -> HistoryResult<Self> {
        let path = root.join(format!("cycle-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(|source| HistoryError::ScratchUnavailable {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copies `source` into the scratch area as `<browser>.db`.
    pub async fn snapshot(&self, browser: &str, source: &Path) -> HistoryResult<PathBuf> {
        let target = self.path.join(format!("{}.db", sanitize_file_stem(browser)));
        tokio::fs::copy(source, &target)
            .await
            .map_err(|err| HistoryError::unavailable(browser, source, err))?;
        Ok(target)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove scratch directory");
            }
        }
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "browser".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_snapshot_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("History");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::write(&source, &bytes).unwrap();

        let scratch = ScratchDir::create(&tmp.path().join("scratch")).unwrap();
        let copy = scratch.snapshot("Chrome", &source).await.unwrap();

        assert_eq!(copy.file_name().unwrap(), "Chrome.db");
        assert_eq!(std::fs::read(&copy).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_scratch_removed_on_drop_after_failure() {
        let tmp = TempDir::new().unwrap();
        let scratch_root = tmp.path().join("scratch");
        let scratch = ScratchDir::create(&scratch_root).unwrap();
        let cycle_dir = scratch.path().to_path_buf();
        assert!(cycle_dir.exists());

        let err = scratch
            .snapshot("Firefox", &tmp.path().join("missing.sqlite"))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::SourceUnavailable { .. }));

        drop(scratch);
        assert!(!cycle_dir.exists());
        // The configured root itself is left alone
        assert!(scratch_root.exists());
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Work Chrome/2"), "Work_Chrome_2");
        assert_eq!(sanitize_file_stem("firefox-dev"), "firefox-dev");
        assert_eq!(sanitize_file_stem(""), "browser");
    }
}
