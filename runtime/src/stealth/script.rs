//! Remote stealth script retrieval.

use crate::acquisition::PageFetcher;
use tracing::{info, warn};

/// Timeout for downloading the stealth bundle.
pub const STEALTH_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Download the stealth bundle, absorbing failures.
///
/// Anti-detection is best effort: a missing bundle only lowers evasion
/// quality, so transport errors, non-2xx responses and empty bodies are
/// logged and mapped to `None`.
pub async fn fetch_stealth_script(fetcher: &dyn PageFetcher, url: &str) -> Option<String> {
    match fetcher.fetch_success(url, STEALTH_FETCH_TIMEOUT_MS).await {
        Ok(body) if !body.trim().is_empty() => {
            info!("loaded stealth script from {url} ({} bytes)", body.len());
            Some(body)
        }
        Ok(_) => {
            warn!("stealth script at {url} is empty, rendering without it");
            None
        }
        Err(e) => {
            warn!("failed to fetch stealth script from {url}, rendering without it: {e}");
            None
        }
    }
}
