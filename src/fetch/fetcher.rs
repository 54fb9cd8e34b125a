//! HTTP document fetcher.
//!
//! Wraps a pooled `reqwest` client, applies the courtesy delay and a
//! per-request timeout, and streams the response body to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS};
use super::courtesy::CourtesyDelay;
use super::error::FetchError;
use super::filename::artifact_filename;

/// Construction options for [`DocumentFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherOptions {
    pub connect_timeout: Duration,
    pub courtesy: CourtesyDelay,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            courtesy: CourtesyDelay::default(),
        }
    }
}

/// Retrieves remote documents into local files.
///
/// Create once and share: clones reuse the same connection pool.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use formscan_core::fetch::DocumentFetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = DocumentFetcher::new();
/// let path = fetcher
///     .fetch("https://example.com/form.pdf", Path::new("/tmp"), Duration::from_secs(30))
///     .await?;
/// println!("saved to {}", path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
    courtesy: CourtesyDelay,
}

impl Default for DocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFetcher {
    /// Creates a fetcher with default options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(FetcherOptions::default())
    }

    /// Creates a fetcher with explicit options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_options(options: FetcherOptions) -> Self {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .gzip(true)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            courtesy: options.courtesy,
        }
    }

    /// Returns the configured courtesy delay.
    #[must_use]
    pub fn courtesy(&self) -> CourtesyDelay {
        self.courtesy
    }

    /// Fetches `url` into `dest_dir`, returning the written file path.
    ///
    /// The whole exchange, body included, must finish within `timeout`.
    /// A partially written file is removed before an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the URL is invalid, the request fails or
    /// times out, the server answers with a non-2xx status, or the file
    /// cannot be written.
    #[instrument(skip(self, dest_dir), fields(url = %url, dest = %dest_dir.display()))]
    pub async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        self.courtesy.wait().await;
        debug!(timeout_ms = timeout.as_millis(), "sending request");

        let response = self
            .client
            .get(parsed.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let file_path = dest_dir.join(artifact_filename(&parsed));
        let mut file = File::create(&file_path)
            .await
            .map_err(|e| FetchError::io(file_path.clone(), e))?;

        match stream_to_file(&mut file, response, url, &file_path).await {
            Ok(bytes) => {
                info!(path = %file_path.display(), bytes, "fetch complete");
                Ok(file_path)
            }
            Err(e) => {
                debug!(path = %file_path.display(), "cleaning up partial file after error");
                drop(file);
                let _ = tokio::fs::remove_file(&file_path).await;
                Err(e)
            }
        }
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn quiet_fetcher() -> DocumentFetcher {
        DocumentFetcher::with_options(FetcherOptions {
            courtesy: CourtesyDelay::disabled(),
            ..FetcherOptions::default()
        })
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_url() {
        let dir = tempfile::tempdir().unwrap();
        let result = quiet_fetcher()
            .fetch("not a url", dir.path(), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let result = quiet_fetcher()
            .fetch("ftp://example.com/form.pdf", dir.path(), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_default_options_use_courtesy_delay() {
        let fetcher = DocumentFetcher::new();
        assert!(!fetcher.courtesy().is_disabled());
    }
}
