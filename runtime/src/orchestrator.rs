//! Fetch, classify, optionally render, then extract.

use crate::acquisition::http_client::DEFAULT_FETCH_TIMEOUT_MS;
use crate::acquisition::PageFetcher;
use crate::classification::{classify, ClassificationResult};
use crate::config::{BrowserConfiguration, BrowserOverrides};
use crate::error::{ConfigError, ExtractError};
use crate::extraction::{self, ExtractionKind, ExtractionOptions, ExtractionResult, DEFAULT_ITEM_CAP};
use crate::pool::BrowserSessionManager;
use crate::renderer::WaitUntil;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-call options for [`ExtractionOrchestrator::extract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Force (`true`) or forbid (`false`) rendering. `None` lets the
    /// classifier decide.
    pub force_headless: Option<bool>,
    pub link_cap: usize,
    pub image_cap: usize,
    pub wait_until: WaitUntil,
    /// Static fetch timeout in milliseconds.
    pub timeout_ms: u64,
    pub browser: BrowserOverrides,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            force_headless: None,
            link_cap: DEFAULT_ITEM_CAP,
            image_cap: DEFAULT_ITEM_CAP,
            wait_until: WaitUntil::default(),
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            browser: BrowserOverrides::default(),
        }
    }
}

impl ExtractOptions {
    fn caps(&self) -> ExtractionOptions {
        ExtractionOptions {
            link_cap: self.link_cap,
            image_cap: self.image_cap,
        }
    }
}

/// Chains the static fetch, classification, optional rendering and
/// extraction.
pub struct ExtractionOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    sessions: Arc<BrowserSessionManager>,
    defaults: BrowserConfiguration,
}

impl ExtractionOrchestrator {
    /// `defaults` are the process-wide browser settings that per-call
    /// overrides are merged onto.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sessions: Arc<BrowserSessionManager>,
        defaults: BrowserConfiguration,
    ) -> Self {
        Self {
            fetcher,
            sessions,
            defaults,
        }
    }

    pub fn sessions(&self) -> &Arc<BrowserSessionManager> {
        &self.sessions
    }

    /// Extract `kind` from `url`.
    ///
    /// Summary and metadata always use the static HTML. Links and text use
    /// rendered HTML when `force_headless` says so, or when it is unset and
    /// the classifier judges the page dynamic.
    pub async fn extract(
        &self,
        url: &str,
        kind: ExtractionKind,
        options: &ExtractOptions,
    ) -> Result<ExtractionResult, ExtractError> {
        if options.timeout_ms == 0 {
            return Err(ConfigError::NonPositiveTimeout.into());
        }
        let browser_config = if kind.may_render() {
            let config = self.defaults.merge(&options.browser);
            config.validate()?;
            Some(config)
        } else {
            None
        };

        let html = self.fetcher.fetch_text(url, options.timeout_ms).await?;

        let Some(config) = browser_config else {
            return Ok(extraction::extract(&html, url, kind, &options.caps()));
        };

        let classification = classify(&html);
        let render = options.force_headless.unwrap_or(classification.is_dynamic);
        debug!(
            url,
            %kind,
            confidence = classification.confidence,
            framework = ?classification.framework,
            forced = ?options.force_headless,
            render,
            "classified page"
        );

        let html = if render {
            info!(url, wait = %options.wait_until, "rendering page");
            self.sessions
                .render(url, options.wait_until, config.navigation_timeout(), &config)
                .await?
        } else {
            html
        };

        Ok(extraction::extract(&html, url, kind, &options.caps()))
    }

    /// Statically fetch `url` and classify it.
    pub async fn classify_url(&self, url: &str, timeout_ms: u64) -> Result<ClassificationResult, ExtractError> {
        if timeout_ms == 0 {
            return Err(ConfigError::NonPositiveTimeout.into());
        }
        let html = self.fetcher.fetch_text(url, timeout_ms).await?;
        Ok(classify(&html))
    }

    /// Shut down the shared browser session, if any.
    pub async fn shutdown(&self) -> Result<(), ExtractError> {
        self.sessions.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STEALTH_URL;
    use crate::error::{NetworkErrorKind, RenderError};
    use crate::extraction::Link;
    use crate::testing::{MockBrowser, MockFetcher};
    use std::sync::atomic::Ordering;

    const STATIC_URL: &str = "https://blog.test/post";
    const DYNAMIC_URL: &str = "https://app.test/";

    const STATIC_PAGE: &str = r#"<html><head><title>Blog</title>
        <meta name="description" content="A post"></head>
        <body><article><h1>Post</h1>
        <p>Plenty of server rendered prose lives here, far more than the sparse text thresholds allow.</p>
        <a href="/static">Static link</a></article></body></html>"#;

    const DYNAMIC_SHELL: &str = r#"<html><head><title>App</title></head>
        <body><div id="__next"></div>
        <script src="/a.js"></script><script src="/b.js"></script><script src="/c.js"></script>
        </body></html>"#;

    const RENDERED: &str = r#"<html><body><div id="__next">
        <a href="/rendered">Rendered link</a><p>Hydrated content</p></div></body></html>"#;

    fn setup() -> (ExtractionOrchestrator, Arc<MockBrowser>) {
        let state = MockBrowser::new();
        state.set_html(RENDERED);
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(STATIC_URL, STATIC_PAGE)
                .with_page(DYNAMIC_URL, DYNAMIC_SHELL)
                .with_page(DEFAULT_STEALTH_URL, "/* stealth */"),
        );
        let sessions = Arc::new(BrowserSessionManager::new(state.launcher(), fetcher.clone()));
        let orchestrator = ExtractionOrchestrator::new(fetcher, sessions, BrowserConfiguration::default());
        (orchestrator, state)
    }

    fn links(result: ExtractionResult) -> Vec<Link> {
        match result {
            ExtractionResult::Links { links } => links,
            other => panic!("expected links, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_static_page_links_without_render() {
        let (orchestrator, state) = setup();
        let result = orchestrator
            .extract(STATIC_URL, ExtractionKind::Links, &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(links(result)[0].href, "/static");
        assert_eq!(state.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dynamic_page_text_is_rendered() {
        let (orchestrator, state) = setup();
        let result = orchestrator
            .extract(DYNAMIC_URL, ExtractionKind::Text, &ExtractOptions::default())
            .await
            .unwrap();
        let ExtractionResult::Text { text } = result else {
            panic!("expected text");
        };
        assert!(text.contains("Hydrated content"));
        assert_eq!(state.launches.load(Ordering::SeqCst), 1);
        assert_eq!(state.open_pages(), 0);
        assert_eq!(
            state.navigations.lock().unwrap()[0],
            (DYNAMIC_URL.to_string(), WaitUntil::NetworkIdle2)
        );
    }

    #[tokio::test]
    async fn test_force_headless_overrides_classifier() {
        let (orchestrator, state) = setup();

        let forced_off = ExtractOptions {
            force_headless: Some(false),
            ..Default::default()
        };
        let result = orchestrator
            .extract(DYNAMIC_URL, ExtractionKind::Links, &forced_off)
            .await
            .unwrap();
        assert!(links(result).is_empty());
        assert_eq!(state.launches.load(Ordering::SeqCst), 0);

        let forced_on = ExtractOptions {
            force_headless: Some(true),
            ..Default::default()
        };
        let result = orchestrator
            .extract(STATIC_URL, ExtractionKind::Links, &forced_on)
            .await
            .unwrap();
        assert_eq!(links(result)[0].href, "/rendered");
        assert_eq!(state.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_summary_and_metadata_never_render() {
        let (orchestrator, state) = setup();
        let forced = ExtractOptions {
            force_headless: Some(true),
            ..Default::default()
        };

        let summary = orchestrator
            .extract(DYNAMIC_URL, ExtractionKind::Summary, &forced)
            .await
            .unwrap();
        let ExtractionResult::Summary { url, title, .. } = summary else {
            panic!("expected summary");
        };
        assert_eq!(url, DYNAMIC_URL);
        assert_eq!(title, "App");

        let metadata = orchestrator
            .extract(STATIC_URL, ExtractionKind::Metadata, &forced)
            .await
            .unwrap();
        let ExtractionResult::Metadata(meta) = metadata else {
            panic!("expected metadata");
        };
        assert_eq!(meta.description.as_deref(), Some("A post"));

        assert_eq!(state.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_cap_applies() {
        let (orchestrator, _) = setup();
        let options = ExtractOptions {
            link_cap: 0,
            ..Default::default()
        };
        let result = orchestrator
            .extract(STATIC_URL, ExtractionKind::Links, &options)
            .await
            .unwrap();
        assert!(links(result).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_names_stage() {
        let (orchestrator, _) = setup();
        let err = orchestrator
            .extract("https://down.test/", ExtractionKind::Summary, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Network(ref e) if e.kind() == NetworkErrorKind::Connect));
    }

    #[tokio::test]
    async fn test_render_timeout_propagates() {
        let (orchestrator, state) = setup();
        state.navigate_delay_ms.store(500, Ordering::SeqCst);
        let options = ExtractOptions {
            browser: BrowserOverrides {
                timeout: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = orchestrator
            .extract(DYNAMIC_URL, ExtractionKind::Text, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Render(RenderError::Timeout { .. })));
        assert_eq!(state.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_invalid_overrides_rejected_before_fetch() {
        let (orchestrator, state) = setup();
        let options = ExtractOptions {
            browser: BrowserOverrides {
                width: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = orchestrator
            .extract(DYNAMIC_URL, ExtractionKind::Links, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Config(ConfigError::InvalidViewport { .. })));
        assert_eq!(state.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classify_url() {
        let (orchestrator, _) = setup();
        let dynamic = orchestrator.classify_url(DYNAMIC_URL, 5_000).await.unwrap();
        assert!(dynamic.is_dynamic);
        let static_page = orchestrator.classify_url(STATIC_URL, 5_000).await.unwrap();
        assert!(!static_page.is_dynamic);
        assert!(static_page.hints.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_after_render() {
        let (orchestrator, state) = setup();
        let forced_on = ExtractOptions {
            force_headless: Some(true),
            ..Default::default()
        };
        orchestrator
            .extract(STATIC_URL, ExtractionKind::Text, &forced_on)
            .await
            .unwrap();
        orchestrator.shutdown().await.unwrap();
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
        assert!(!orchestrator.sessions().has_session().await);
    }

    #[test]
    fn test_options_deserialize_camel_case_with_defaults() {
        let options: ExtractOptions = serde_json::from_str(
            r#"{"forceHeadless": true, "waitUntil": "load", "browser": {"userAgents": ["UA"]}}"#,
        )
        .unwrap();
        assert_eq!(options.force_headless, Some(true));
        assert_eq!(options.wait_until, WaitUntil::Load);
        assert_eq!(options.link_cap, 10);
        assert_eq!(options.browser.user_agents, Some(vec!["UA".to_string()]));
    }
}
