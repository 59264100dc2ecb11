//! Typed errors for each stage of the extraction pipeline.
//!
//! Classification and extraction never fail, so only the network fetch,
//! the rendering engine and configuration validation have error types.

use thiserror::Error;

/// Broad category of a static fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Dns,
    InvalidUrl,
    Status,
    Other,
}

/// Failure of the static (non-rendered) HTTP fetch.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },
    #[error("could not resolve host for {url}: {message}")]
    Dns { url: String, message: String },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl NetworkError {
    pub fn kind(&self) -> NetworkErrorKind {
        match self {
            NetworkError::Timeout { .. } => NetworkErrorKind::Timeout,
            NetworkError::Connect { .. } => NetworkErrorKind::Connect,
            NetworkError::Dns { .. } => NetworkErrorKind::Dns,
            NetworkError::InvalidUrl(_) => NetworkErrorKind::InvalidUrl,
            NetworkError::Status { .. } => NetworkErrorKind::Status,
            NetworkError::Other { .. } => NetworkErrorKind::Other,
        }
    }
}

/// Failure inside the rendering engine: launch, tab setup or navigation.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("browser page operation failed: {0}")]
    Page(String),
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout { .. })
    }
}

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be positive")]
    NonPositiveTimeout,
    #[error("viewport dimensions must be positive, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("user agent pool is empty")]
    EmptyUserAgents,
    #[error("invalid stealth script url {url}: {message}")]
    InvalidStealthUrl { url: String, message: String },
}

/// Error returned by the orchestrator, naming the stage that failed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("fetch stage: {0}")]
    Network(#[from] NetworkError),
    #[error("render stage: {0}")]
    Render(#[from] RenderError),
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}
