//! HTTP document download for content verification.

use std::time::Duration;

use async_trait::async_trait;
use earnings_core::{DocumentFetcher, EarningsError, Result};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default number of download attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads documents over HTTP, retrying failed attempts.
///
/// Both transport errors and non-success statuses are retried, up to
/// `max_retries` attempts in total.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with `user_agent`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| EarningsError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Creates a fetcher using a pre-configured client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Sets the number of attempts. Zero is treated as one.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the pause between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EarningsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EarningsError::Network(format!("HTTP {} for {}", status, url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EarningsError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = self.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    debug!(url, bytes = bytes.len(), attempt, "Downloaded document");
                    return Ok(bytes);
                }
                Err(e) if attempt < attempts => {
                    warn!(url, attempt, error = %e, "Download failed, retrying");
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let fetcher = HttpFetcher::new("Test/1.0 (test@example.com)").unwrap();
        assert_eq!(fetcher.max_retries, 3);
        assert_eq!(fetcher.retry_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_after_retries() {
        let fetcher = HttpFetcher::new("Test/1.0 (test@example.com)")
            .unwrap()
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(1));
        // Port 9 on localhost is the discard service and is normally closed.
        let result = fetcher.fetch("http://127.0.0.1:9/missing.pdf").await;
        assert!(matches!(result, Err(EarningsError::Network(_))));
    }
}
