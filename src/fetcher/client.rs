//! HTTP fetcher for a single remote asset.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::TryStreamExt;
use reqwest::header::HeaderMap;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use super::models::{FetchError, FetchErrorKind, FetchOutcome};
use super::progress::ProgressBoard;
use super::retry_policy::RetryPolicy;
use crate::config::FetchSettings;

/// Size of the buffer the response body is copied through.
const CHUNK_SIZE: usize = 64 * 1024;

/// Streams assets to disk with retry and backoff.
///
/// Never fails hard: every transport, status, timeout and storage problem is
/// logged and folded into a [`FetchOutcome`].
pub struct AssetFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    min_asset_bytes: u64,
    progress: ProgressBoard,
}

impl AssetFetcher {
    /// Create a new fetcher.
    ///
    /// The timeout applies to connecting and to each read stall, so a slow
    /// but steady large download is never cut off.
    pub fn new(settings: &FetchSettings, progress: ProgressBoard) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            policy: RetryPolicy::new(settings),
            min_asset_bytes: settings.min_asset_bytes,
            progress,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn min_asset_bytes(&self) -> u64 {
        self.min_asset_bytes
    }

    /// Fetch with the configured attempt budget and no extra headers.
    pub async fn fetch_default(&self, url: &str, destination: &Path) -> FetchOutcome {
        self.fetch(url, destination, &HeaderMap::new(), self.policy.max_attempts)
            .await
    }

    /// Download `url` into `destination`, retrying up to `max_attempts` times.
    ///
    /// On failure no partial or undersized file is left at `destination`.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        headers: &HeaderMap,
        max_attempts: u32,
    ) -> FetchOutcome {
        let max_attempts = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(url, destination, headers).await {
                Ok(bytes) => {
                    debug!(
                        "Fetched {} ({} bytes, attempt {}/{})",
                        url, bytes, attempt, max_attempts
                    );
                    return FetchOutcome::success(bytes, attempt, last_error);
                }
                Err(e) => {
                    warn!(
                        "Download failed: {} (attempt {}/{}, {}): {}",
                        url,
                        attempt,
                        max_attempts,
                        e.kind.as_str(),
                        e
                    );
                    discard(destination).await;
                    last_error = Some(e.kind);

                    if attempt < max_attempts {
                        let delay = self.policy.delay_with_jitter(attempt, &mut rand::rng());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        FetchOutcome::failure(last_error, max_attempts)
    }

    /// One GET, streamed to `destination` in fixed-size chunks.
    ///
    /// Returns the number of bytes written.
    async fn attempt(
        &self,
        url: &str,
        destination: &Path,
        headers: &HeaderMap,
    ) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FetchErrorKind::Status(status.as_u16()),
                format!("HTTP {}", status),
            ));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let progress = self.progress.start(&progress_label(url), response.content_length());
        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let mut reader = StreamReader::new(stream);
        let mut file = File::create(destination).await?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await.map_err(read_error)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            written += n as u64;
            progress.advance(n as u64);
        }
        file.flush().await?;

        if written < self.min_asset_bytes {
            return Err(FetchError::new(
                FetchErrorKind::TooSmall(written),
                format!(
                    "Response too small: {} bytes (minimum {})",
                    written, self.min_asset_bytes
                ),
            ));
        }

        Ok(written)
    }
}

/// Classify an error surfaced while reading the body stream.
fn read_error(err: std::io::Error) -> FetchError {
    let timed_out = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
        .map(|e| e.is_timeout())
        .unwrap_or(err.kind() == std::io::ErrorKind::TimedOut);
    let kind = if timed_out {
        FetchErrorKind::Timeout
    } else {
        FetchErrorKind::Body
    };
    FetchError::new(kind, err.to_string())
}

/// Best-effort removal of a partial download.
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {:?}: {}", path, e),
    }
}

fn progress_label(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        let fetcher = AssetFetcher::new(&FetchSettings::default(), ProgressBoard::hidden()).unwrap();
        assert_eq!(fetcher.min_asset_bytes(), 1024);
        assert_eq!(fetcher.policy().max_attempts, 3);
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label("https://cdn1.suno.ai/abc.mp3"), "abc.mp3");
        assert_eq!(progress_label("abc"), "abc");
    }

    #[test]
    fn test_read_error_classification() {
        let stall = std::io::Error::new(std::io::ErrorKind::TimedOut, "stall");
        assert_eq!(read_error(stall).kind, FetchErrorKind::Timeout);

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(read_error(reset).kind, FetchErrorKind::Body);
    }

    #[tokio::test]
    async fn test_discard_missing_file_is_silent() {
        let dir = tempfile::TempDir::new().unwrap();
        discard(&dir.path().join("nothing.bin")).await;

        let file = dir.path().join("partial.bin");
        std::fs::write(&file, b"abc").unwrap();
        discard(&file).await;
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_unreachable_origin_fails_without_leftovers() {
        let settings = FetchSettings {
            timeout_secs: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_jitter_ms: 0,
            ..Default::default()
        };
        let fetcher = AssetFetcher::new(&settings, ProgressBoard::hidden()).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("audio.mp3");

        // Port 9 (discard) on localhost is closed in test environments.
        let outcome = fetcher
            .fetch("http://127.0.0.1:9/x.mp3", &dest, &HeaderMap::new(), 2)
            .await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.last_error.is_some());
        assert!(!dest.exists());
    }
}
