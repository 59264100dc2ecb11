//! `pagesift classify <url>`: print the rendering verdict for a page.

use crate::acquisition::http_client::DEFAULT_FETCH_TIMEOUT_MS;
use crate::cli::{build_orchestrator, output};
use crate::config::BrowserConfiguration;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Page URL
    pub url: String,

    /// Static fetch timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

pub async fn run(args: ClassifyArgs) -> Result<()> {
    let orchestrator = build_orchestrator(BrowserConfiguration::from_env())?;
    let result = orchestrator
        .classify_url(&args.url, args.timeout_ms)
        .await
        .with_context(|| format!("failed to classify {}", args.url))?;
    output::print_json(&result)
}
