//! Renderer abstraction for browser-based page rendering.
//!
//! [`Launcher`] starts a browser engine, [`Renderer`] is a running engine,
//! and [`RenderContext`] is a single tab. The production implementation is
//! Chromium via chromiumoxide; tests substitute in-memory mocks.

pub mod chromium;
pub mod wait;

use crate::config::BrowserConfiguration;
use crate::error::RenderError;
use crate::stealth::headers::HeaderRewrite;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use wait::WaitUntil;

/// Result of navigating a tab to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken until the wait policy was satisfied.
    pub load_time_ms: u64,
}

/// Starts browser engines.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, config: &BrowserConfiguration) -> Result<Arc<dyn Renderer>, RenderError>;
}

/// A running browser engine that can open tabs.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new blank tab.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError>;
    /// Whether the engine process is still reachable.
    fn is_connected(&self) -> bool;
    /// Terminate the engine process.
    async fn shutdown(&self) -> Result<(), RenderError>;
}

/// A single browser tab.
#[async_trait]
pub trait RenderContext: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError>;
    /// Rewrite the headers of every request the tab sends from now on.
    async fn intercept_requests(&mut self, rewrite: HeaderRewrite) -> Result<(), RenderError>;
    /// Register a script that runs before any page script on every document.
    async fn add_init_script(&self, script: &str) -> Result<(), RenderError>;
    async fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<NavigationResult, RenderError>;
    /// Serialized HTML of the current document.
    async fn get_html(&self) -> Result<String, RenderError>;
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
