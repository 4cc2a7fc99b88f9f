//! AWS S3 storage implementation.
//!
//! Mirrors the local layout under `{bucket}/{prefix}/`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{RunReport, SeenRecord};
use crate::storage::{ReportStore, SeenStore, paths};

/// S3-backed seen-store and report sink.
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    seen_lock: Mutex<()>,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
            seen_lock: Mutex::new(()),
        }
    }

    /// Create S3 storage from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "nowplaying".to_string());
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "harvest".to_string());

        Ok(Self::new(client, bucket, prefix))
    }

    fn key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), key)
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = self.key(key);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(AppError::storage)?;
                Ok(Some(serde_json::from_slice(&bytes.into_bytes())?))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    info!("No existing data at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String> {
        let key = self.key(key);
        let bytes = ByteStream::from(serde_json::to_vec_pretty(value)?);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(bytes)
            .content_type("application/json")
            .send()
            .await
            .map_err(AppError::storage)?;

        Ok(format!("s3://{}/{}", self.bucket, key))
    }
}

#[async_trait]
impl SeenStore for S3Storage {
    async fn find_all_keys(&self) -> Result<Vec<String>> {
        let records: Vec<SeenRecord> = self.read_json(paths::SEEN).await?.unwrap_or_default();
        Ok(records.into_iter().map(|r| r.link).collect())
    }

    async fn insert(&self, record: &SeenRecord) -> Result<()> {
        let _guard = self.seen_lock.lock().await;

        let mut records: Vec<SeenRecord> = self.read_json(paths::SEEN).await?.unwrap_or_default();
        if records.iter().any(|r| r.link == record.link) {
            return Ok(());
        }
        records.push(record.clone());
        self.write_json(paths::SEEN, &records).await?;
        Ok(())
    }
}

#[async_trait]
impl ReportStore for S3Storage {
    async fn write_report(&self, report: &RunReport) -> Result<String> {
        let location = self
            .write_json(&paths::report_key(report.generated_at), report)
            .await?;
        self.write_json(paths::LATEST_REPORT, report).await?;

        info!("Report with {} entries written to {}", report.entries.len(), location);
        Ok(location)
    }

    async fn latest_report(&self) -> Result<Option<RunReport>> {
        self.read_json(paths::LATEST_REPORT).await
    }
}
