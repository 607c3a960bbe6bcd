//! Saved scans.
//!
//! The CLI runs scan and generate as separate processes, so each scan is
//! written to `{dir}/{scan_id}.json`. A generate reads it back into the
//! pipeline's scan cache, where the usual TTL applies.

use chrono::{DateTime, Duration, Utc};
use edgarbook::{ScanEntry, ScanId};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Error type for scan store operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScanStoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Scan file could not be (de)serialized.
    #[error("Scan file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory of scan files.
#[derive(Debug, Clone)]
pub(crate) struct ScanStore {
    dir: PathBuf,
}

impl ScanStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: &ScanId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write `entry`, creating the directory if needed.
    pub(crate) fn save(&self, id: &ScanId, entry: &ScanEntry) -> Result<PathBuf, ScanStoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(id);
        fs::write(&path, serde_json::to_string(entry)?)?;
        Ok(path)
    }

    /// Read a saved scan; `None` if there is no file for `id`.
    pub(crate) fn load(&self, id: &ScanId) -> Result<Option<ScanEntry>, ScanStoreError> {
        match fs::read_to_string(self.path(id)) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete scans older than `ttl` as of `now`, and files that no longer
    /// parse. Returns how many were removed.
    pub(crate) fn prune(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, ScanStoreError> {
        let mut removed = 0;
        for path in self.scan_files()? {
            if is_stale(&path, ttl, now) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Number of saved scan files.
    pub(crate) fn count(&self) -> Result<usize, ScanStoreError> {
        Ok(self.scan_files()?.len())
    }

    /// Delete every saved scan. Returns how many were removed.
    pub(crate) fn clear(&self) -> Result<usize, ScanStoreError> {
        let files = self.scan_files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        Ok(files.len())
    }

    fn scan_files(&self) -> Result<Vec<PathBuf>, ScanStoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn is_stale(path: &Path, ttl: Duration, now: DateTime<Utc>) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|json| serde_json::from_str::<ScanEntry>(&json).ok())
        .is_none_or(|entry| now - entry.created_at > ttl)
}
