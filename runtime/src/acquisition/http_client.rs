//! reqwest-backed HTTP client for static page fetches.

use super::PageFetcher;
use crate::error::NetworkError;
use crate::stealth::fingerprint::DEFAULT_USER_AGENTS;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default timeout for static fetches in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Response of a static GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The requested URL.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub elapsed_ms: u64,
}

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client presenting a desktop browser user agent.
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_user_agent(DEFAULT_USER_AGENTS[0])
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| NetworkError::Other {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// GET `url` with a per-request timeout.
    ///
    /// Non-2xx responses are returned, not treated as errors: error pages
    /// still carry extractable content.
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse, NetworkError> {
        let parsed = url::Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NetworkError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let start = Instant::now();
        let resp = self
            .client
            .get(parsed)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, timeout_ms, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if !resp.status().is_success() {
            warn!("GET {url} returned status {status}");
        }

        let body = resp
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, timeout_ms, e))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!("GET {url} -> {status} ({} bytes, {elapsed_ms}ms)", body.len());

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            body,
            elapsed_ms,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_text(&self, url: &str, timeout_ms: u64) -> Result<String, NetworkError> {
        Ok(self.get(url, timeout_ms).await?.body)
    }

    async fn fetch_success(&self, url: &str, timeout_ms: u64) -> Result<String, NetworkError> {
        let resp = self.get(url, timeout_ms).await?;
        if !(200..300).contains(&resp.status) {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }
        Ok(resp.body)
    }
}

/// Sort a reqwest failure into timeout, DNS, connect, or other.
fn map_reqwest_error(url: &str, timeout_ms: u64, err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        return NetworkError::Timeout {
            url: url.to_string(),
            timeout_ms,
        };
    }

    let message = error_chain(&err);
    if is_dns_failure(&message) {
        NetworkError::Dns {
            url: url.to_string(),
            message,
        }
    } else if err.is_connect() {
        NetworkError::Connect {
            url: url.to_string(),
            message,
        }
    } else if err.is_builder() {
        NetworkError::InvalidUrl(format!("{url}: {message}"))
    } else {
        NetworkError::Other {
            url: url.to_string(),
            message,
        }
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        parts.push(s.to_string());
        source = s.source();
    }
    parts.join(": ")
}

fn is_dns_failure(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("dns error")
        || m.contains("failed to lookup address")
        || m.contains("name or service not known")
        || m.contains("no such host")
        || m.contains("nodename nor servname")
}
