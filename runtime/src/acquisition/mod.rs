//! Static page acquisition over plain HTTP.
//!
//! The [`PageFetcher`] trait is the network capability the rest of the
//! runtime depends on; [`http_client::HttpClient`] is the reqwest-backed
//! implementation.

pub mod http_client;

use crate::error::NetworkError;
use async_trait::async_trait;

/// Fetch a URL and return its body as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, giving up after `timeout_ms`.
    async fn fetch_text(&self, url: &str, timeout_ms: u64) -> Result<String, NetworkError>;

    /// Like [`fetch_text`](Self::fetch_text), but a non-2xx response is an
    /// error. Fetchers without status information fall back to `fetch_text`.
    async fn fetch_success(&self, url: &str, timeout_ms: u64) -> Result<String, NetworkError> {
        self.fetch_text(url, timeout_ms).await
    }
}
