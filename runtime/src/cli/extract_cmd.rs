//! `pagesift extract <url>`: run the adaptive pipeline and print JSON.

use crate::acquisition::http_client::DEFAULT_FETCH_TIMEOUT_MS;
use crate::cli::{build_orchestrator, output};
use crate::config::{BrowserConfiguration, BrowserOverrides};
use crate::extraction::{ExtractionKind, DEFAULT_ITEM_CAP};
use crate::orchestrator::ExtractOptions;
use crate::renderer::WaitUntil;
use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Page URL
    pub url: String,

    /// Output shape: summary, metadata, links or text
    #[arg(short, long, default_value = "summary")]
    pub kind: ExtractionKind,

    /// Force (true) or forbid (false) browser rendering for links/text
    #[arg(long, value_name = "BOOL")]
    pub force_headless: Option<bool>,

    /// Maximum number of links returned
    #[arg(long, default_value_t = DEFAULT_ITEM_CAP)]
    pub link_cap: usize,

    /// Maximum number of images returned
    #[arg(long, default_value_t = DEFAULT_ITEM_CAP)]
    pub image_cap: usize,

    /// Navigation wait policy: load, domcontentloaded, networkidle0 or networkidle2
    #[arg(long, default_value = "networkidle2")]
    pub wait_until: WaitUntil,

    /// Static fetch timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Navigation timeout in milliseconds (default from PAGESIFT_TIMEOUT_MS)
    #[arg(long)]
    pub render_timeout_ms: Option<u64>,

    /// Skip the stealth evasion script
    #[arg(long)]
    pub no_stealth: bool,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        ExtractOptions {
            force_headless: self.force_headless,
            link_cap: self.link_cap,
            image_cap: self.image_cap,
            wait_until: self.wait_until,
            timeout_ms: self.timeout_ms,
            browser: BrowserOverrides {
                headless: self.headful.then_some(false),
                stealth: self.no_stealth.then_some(false),
                timeout: self.render_timeout_ms,
                ..Default::default()
            },
        }
    }
}

pub async fn run(args: ExtractArgs) -> Result<()> {
    let orchestrator = build_orchestrator(BrowserConfiguration::from_env())?;
    let options = args.options();
    info!(url = %args.url, kind = %args.kind, "extracting");

    let outcome = tokio::select! {
        result = orchestrator.extract(&args.url, args.kind, &options) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Err(e) = orchestrator.shutdown().await {
        warn!("browser shutdown failed: {e}");
    }

    let Some(result) = outcome else {
        bail!("interrupted");
    };
    let result = result.with_context(|| format!("failed to extract {} from {}", args.kind, args.url))?;
    output::print_json(&result)
}
