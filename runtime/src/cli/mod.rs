//! CLI subcommand implementations for the pagesift binary.

pub mod classify_cmd;
pub mod doctor;
pub mod extract_cmd;
pub mod output;

use crate::acquisition::http_client::HttpClient;
use crate::config::BrowserConfiguration;
use crate::orchestrator::ExtractionOrchestrator;
use crate::pool::BrowserSessionManager;
use crate::renderer::chromium::ChromiumLauncher;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing on stderr. `PAGESIFT_LOG_FORMAT=json` selects JSON
/// lines; `RUST_LOG` adds directives on top of `pagesift=info`.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "pagesift=info".parse() {
        filter = filter.add_directive(directive);
    }
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("PAGESIFT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wire the production fetcher, Chromium launcher and session manager.
pub fn build_orchestrator(defaults: BrowserConfiguration) -> Result<ExtractionOrchestrator> {
    defaults
        .validate()
        .context("invalid browser configuration from environment")?;
    let fetcher = Arc::new(HttpClient::new().context("failed to build HTTP client")?);
    let sessions = Arc::new(BrowserSessionManager::new(
        Arc::new(ChromiumLauncher),
        fetcher.clone(),
    ));
    Ok(ExtractionOrchestrator::new(fetcher, sessions, defaults))
}
