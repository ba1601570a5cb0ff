//! Bounded exponential-backoff retry for asset uploads.
//!
//! Only [`UploadError::Transient`] failures are retried; a rejected file
//! fails immediately.

use std::time::Duration;

use crate::draft::PendingFile;
use crate::services::{AssetCategory, AssetUploader, UploadError, UploadedAsset};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Upload `file`, retrying transient failures with exponential backoff.
pub async fn upload_with_retry(
    uploader: &dyn AssetUploader,
    file: &PendingFile,
    category: AssetCategory,
    config: &RetryConfig,
) -> Result<UploadedAsset, UploadError> {
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match uploader.upload(file, category).await {
            Ok(asset) => {
                tracing::debug!(
                    file_name = %file.file_name,
                    category = category.as_str(),
                    attempt,
                    "Asset uploaded",
                );
                return Ok(asset);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    file_name = %file.file_name,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Upload attempt {attempt} failed, retrying",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                tracing::warn!(
                    file_name = %file.file_name,
                    error = %e,
                    attempt,
                    "Upload failed",
                );
                return Err(e);
            }
        }
    }
}
