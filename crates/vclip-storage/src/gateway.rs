//! Dual-backend storage gateway: a primary R2 bucket, an optional secondary
//! S3-compatible bucket, and a local-filesystem fallback for degraded mode.
//!
//! Grounded on `R2Client`'s upload/download surface (`client.rs`) and the
//! precondition-retry idiom in `vclip-firestore`'s
//! `update_clip_size_with_retry`, generalized here into a fixed-attempt
//! retry loop per spec.md's object-storage contract.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{error, warn};

use vclip_models::constants::{STORAGE_RETRY_ATTEMPTS, STORAGE_RETRY_BASE_DELAY_MS};

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

/// Object storage fronting the pipeline's uploaded sources and rendered
/// outputs. Writes go to `primary` with retry, then `secondary` if
/// configured, then the local fallback directory as a last resort so a
/// render never fails purely because object storage is unreachable.
pub struct StorageGateway {
    primary: R2Client,
    secondary: Option<R2Client>,
    local_fallback_dir: Option<PathBuf>,
    bucket_ready: OnceCell<bool>,
}

impl StorageGateway {
    pub fn new(primary: R2Client) -> Self {
        Self {
            primary,
            secondary: None,
            local_fallback_dir: None,
            bucket_ready: OnceCell::new(),
        }
    }

    pub fn with_secondary(mut self, secondary: R2Client) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_local_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_fallback_dir = Some(dir.into());
        self
    }

    /// Checks bucket connectivity once per process lifetime and caches the
    /// result; callers that just want a readiness probe don't pay for a
    /// head-bucket call on every invocation.
    pub async fn ensure_ready(&self) -> StorageResult<()> {
        let ready = self
            .bucket_ready
            .get_or_init(|| async { self.primary.check_connectivity().await.is_ok() })
            .await;
        if *ready {
            Ok(())
        } else {
            Err(StorageError::config_error(
                "primary storage backend failed connectivity check",
            ))
        }
    }

    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()> {
        match Self::upload_with_retry(&self.primary, &data, key, content_type).await {
            Ok(()) => return Ok(()),
            Err(primary_err) => {
                warn!(key, error = %primary_err, "primary storage upload failed, trying fallback");
                if let Some(secondary) = &self.secondary {
                    if Self::upload_with_retry(secondary, &data, key, content_type)
                        .await
                        .is_ok()
                    {
                        return Ok(());
                    }
                }
                if let Some(dir) = &self.local_fallback_dir {
                    return Self::write_local(dir, key, &data).await;
                }
                Err(primary_err)
            }
        }
    }

    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let data = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        self.upload_bytes(data, key, content_type).await
    }

    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        match Self::download_with_retry(&self.primary, key).await {
            Ok(bytes) => Ok(bytes),
            Err(primary_err) => {
                if let Some(secondary) = &self.secondary {
                    if let Ok(bytes) = Self::download_with_retry(secondary, key).await {
                        return Ok(bytes);
                    }
                }
                if let Some(dir) = &self.local_fallback_dir {
                    if let Ok(bytes) = Self::read_local(dir, key).await {
                        return Ok(bytes);
                    }
                }
                Err(primary_err)
            }
        }
    }

    /// `downloadObjectToFile` (spec.md §4.10): download `key` and write it to
    /// `dest_path`, failing hard (`StorageError`) only once both backends and
    /// the local fallback have been exhausted.
    pub async fn download_object_to_file(&self, key: &str, dest_path: impl AsRef<Path>) -> StorageResult<()> {
        let bytes = self.download_bytes(key).await?;
        let dest_path = dest_path.as_ref();
        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
        }
        tokio::fs::write(dest_path, bytes).await.map_err(StorageError::Io)
    }

    async fn download_with_retry(client: &R2Client, key: &str) -> StorageResult<Vec<u8>> {
        let mut last_error = None;
        for attempt in 0..STORAGE_RETRY_ATTEMPTS {
            match client.download_bytes(key).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    last_error = Some(e);
                    let delay = STORAGE_RETRY_BASE_DELAY_MS * (attempt as u64 + 1);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
        Err(last_error.expect("loop runs at least once"))
    }

    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let primary_result = self.primary.delete_object(key).await;
        if let Some(secondary) = &self.secondary {
            let _ = secondary.delete_object(key).await;
        }
        if let Some(dir) = &self.local_fallback_dir {
            let _ = tokio::fs::remove_file(dir.join(key)).await;
        }
        primary_result
    }

    /// `signedGetUrl` (spec.md §4.10): primary if configured, else secondary.
    pub async fn signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        match self.primary.presign_get(key, expiry).await {
            Ok(url) => Ok(url),
            Err(primary_err) => {
                if let Some(secondary) = &self.secondary {
                    secondary.presign_get(key, expiry).await
                } else {
                    Err(primary_err)
                }
            }
        }
    }

    async fn upload_with_retry(
        client: &R2Client,
        data: &[u8],
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let mut last_error = None;
        for attempt in 0..STORAGE_RETRY_ATTEMPTS {
            match client.upload_bytes(data.to_vec(), key, content_type).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = Some(e);
                    let delay = STORAGE_RETRY_BASE_DELAY_MS * (attempt as u64 + 1);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
        let err = last_error.expect("loop runs at least once");
        error!(key, attempts = STORAGE_RETRY_ATTEMPTS, "upload exhausted retries");
        Err(err)
    }

    async fn write_local(dir: &Path, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::Io)?;
        }
        tokio::fs::write(&path, data).await.map_err(StorageError::Io)
    }

    async fn read_local(dir: &Path, key: &str) -> StorageResult<Vec<u8>> {
        tokio::fs::read(dir.join(key))
            .await
            .map_err(|_| StorageError::not_found(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_local_fallback_round_trips() {
        let dir = std::env::temp_dir().join(format!("vclip-storage-test-{}", std::process::id()));
        StorageGateway::write_local(&dir, "outputs/a/output.mp4", b"hello")
            .await
            .unwrap();
        let back = StorageGateway::read_local(&dir, "outputs/a/output.mp4").await.unwrap();
        assert_eq!(back, b"hello");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn read_local_missing_key_is_not_found() {
        let dir = std::env::temp_dir().join("vclip-storage-test-missing");
        let result = StorageGateway::read_local(&dir, "nope").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
