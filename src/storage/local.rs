//! Local filesystem storage implementation.
//!
//! Every write goes through a temp file and a rename so a crash never leaves
//! a half-written `seen.json` behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{RunReport, SeenRecord};
use crate::storage::{ReportStore, SeenStore, paths};

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    // Serialises read-modify-write cycles on seen.json.
    seen_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            seen_lock: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_seen(&self) -> Result<Vec<SeenRecord>> {
        Ok(self.read_json(paths::SEEN).await?.unwrap_or_default())
    }
}

#[async_trait]
impl SeenStore for LocalStorage {
    async fn find_all_keys(&self) -> Result<Vec<String>> {
        let records = self.load_seen().await?;
        debug!("Loaded {} seen links from {:?}", records.len(), self.root_dir);
        Ok(records.into_iter().map(|r| r.link).collect())
    }

    async fn insert(&self, record: &SeenRecord) -> Result<()> {
        let _guard = self.seen_lock.lock().await;

        let mut records = self.load_seen().await?;
        if records.iter().any(|r| r.link == record.link) {
            return Ok(());
        }
        records.push(record.clone());
        self.write_json(paths::SEEN, &records).await
    }
}

#[async_trait]
impl ReportStore for LocalStorage {
    async fn write_report(&self, report: &RunReport) -> Result<String> {
        let key = paths::report_key(report.generated_at);
        self.write_json(&key, report).await?;
        self.write_json(paths::LATEST_REPORT, report).await?;

        let location = self.path(&key).display().to_string();
        info!("Report with {} entries written to {}", report.entries.len(), location);
        Ok(location)
    }

    async fn latest_report(&self) -> Result<Option<RunReport>> {
        self.read_json(paths::LATEST_REPORT).await
    }
}
