//! Shared browser session management.
//!
//! One browser process serves every render. The session slot is guarded
//! by an async mutex held across the launch, so concurrent callers that
//! find it empty wait for a single launch instead of racing.

use super::page::PageHandle;
use crate::acquisition::PageFetcher;
use crate::config::BrowserConfiguration;
use crate::error::RenderError;
use crate::renderer::{Launcher, Renderer, WaitUntil};
use crate::stealth::fingerprint::{pick_user_agent, PROPERTY_OVERRIDES_SCRIPT};
use crate::stealth::headers::rewrite_headers;
use crate::stealth::script::fetch_stealth_script;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A launched browser process and the configuration it was launched with.
pub struct BrowserSession {
    pub id: Uuid,
    pub config: BrowserConfiguration,
    pub launched_at: Instant,
    renderer: Arc<dyn Renderer>,
}

impl BrowserSession {
    fn new(renderer: Arc<dyn Renderer>, config: BrowserConfiguration) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            launched_at: Instant::now(),
            renderer,
        }
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn is_connected(&self) -> bool {
        self.renderer.is_connected()
    }
}

/// Owns the shared browser session and hands out prepared tabs.
pub struct BrowserSessionManager {
    launcher: Arc<dyn Launcher>,
    fetcher: Arc<dyn PageFetcher>,
    session: Mutex<Option<Arc<BrowserSession>>>,
    stealth_script: OnceCell<Option<Arc<str>>>,
    active_pages: Arc<AtomicUsize>,
    launches: AtomicUsize,
}

impl BrowserSessionManager {
    /// `fetcher` downloads the stealth bundle.
    pub fn new(launcher: Arc<dyn Launcher>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            launcher,
            fetcher,
            session: Mutex::new(None),
            stealth_script: OnceCell::new(),
            active_pages: Arc::new(AtomicUsize::new(0)),
            launches: AtomicUsize::new(0),
        }
    }

    /// The live session, launching one if the slot is empty or the browser
    /// has gone away. A failed launch leaves the slot empty.
    pub async fn session(&self, config: &BrowserConfiguration) -> Result<Arc<BrowserSession>, RenderError> {
        let mut slot = self.session.lock().await;

        if let Some(existing) = slot.as_ref() {
            if existing.is_connected() {
                return Ok(Arc::clone(existing));
            }
            warn!(session = %existing.id, "browser disconnected, relaunching");
            *slot = None;
        }

        let renderer = self.launcher.launch(config).await?;
        self.launches.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(BrowserSession::new(renderer, config.clone()));
        info!(session = %session.id, headless = config.headless, "browser session started");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The shared session plus a fresh tab with user agent, header
    /// rewriting and init scripts applied.
    pub async fn acquire(
        &self,
        config: &BrowserConfiguration,
    ) -> Result<(Arc<BrowserSession>, PageHandle), RenderError> {
        let session = self.session(config).await?;
        let stealth = if config.stealth {
            self.stealth_script(&config.stealth_url).await
        } else {
            None
        };

        let context = session.renderer().new_context().await?;
        let mut page = PageHandle::new(context, Arc::clone(&self.active_pages));
        if let Err(e) = prepare_page(&mut page, config, stealth.as_deref()).await {
            page.close().await;
            return Err(e);
        }
        Ok((session, page))
    }

    /// Navigate a fresh tab to `url` and return the materialized HTML.
    /// The tab is closed on every exit path.
    pub async fn render(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
        config: &BrowserConfiguration,
    ) -> Result<String, RenderError> {
        let (session, mut page) = self.acquire(config).await?;
        debug!(session = %session.id, url, wait = %wait, "rendering");

        let outcome = tokio::time::timeout(timeout, async {
            let nav = page.context_mut().navigate(url, wait).await?;
            debug!(url, final_url = %nav.final_url, load_time_ms = nav.load_time_ms, "navigation settled");
            page.context().get_html().await
        })
        .await;
        page.close().await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Terminate the browser and clear the session slot.
    pub async fn shutdown(&self) -> Result<(), RenderError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        info!(session = %session.id, "shutting down browser session");
        session.renderer().shutdown().await
    }

    /// Number of tabs currently open.
    pub fn active_pages(&self) -> usize {
        self.active_pages.load(Ordering::SeqCst)
    }

    /// Number of successful browser launches.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Memoized stealth bundle. Fetched at most once per manager, and a
    /// failed fetch is remembered as `None`.
    async fn stealth_script(&self, url: &str) -> Option<Arc<str>> {
        self.stealth_script
            .get_or_init(|| async {
                fetch_stealth_script(self.fetcher.as_ref(), url)
                    .await
                    .map(Arc::from)
            })
            .await
            .clone()
    }
}

async fn prepare_page(
    page: &mut PageHandle,
    config: &BrowserConfiguration,
    stealth: Option<&str>,
) -> Result<(), RenderError> {
    let context = page.context_mut();
    if let Some(user_agent) = pick_user_agent(&config.user_agents) {
        context.set_user_agent(user_agent).await?;
    }
    context.intercept_requests(rewrite_headers).await?;
    if let Some(script) = stealth {
        context.add_init_script(script).await?;
    }
    context.add_init_script(PROPERTY_OVERRIDES_SCRIPT).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrowserOverrides, DEFAULT_STEALTH_URL};
    use crate::stealth::headers::HEADER_PROFILE;
    use crate::testing::{MockBrowser, MockFetcher};

    const STEALTH_BODY: &str = "/* stealth */";

    fn manager(state: &Arc<MockBrowser>, fetcher: MockFetcher) -> (BrowserSessionManager, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let manager = BrowserSessionManager::new(state.launcher(), fetcher.clone());
        (manager, fetcher)
    }

    fn with_stealth() -> MockFetcher {
        MockFetcher::new().with_page(DEFAULT_STEALTH_URL, STEALTH_BODY)
    }

    #[tokio::test]
    async fn test_concurrent_acquire_launches_once() {
        let state = MockBrowser::new();
        state.launch_delay_ms.store(50, Ordering::SeqCst);
        let (manager, _) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        let (a, b) = tokio::join!(manager.acquire(&config), manager.acquire(&config));
        let (session_a, page_a) = a.unwrap();
        let (session_b, page_b) = b.unwrap();

        assert_eq!(state.launches.load(Ordering::SeqCst), 1);
        assert_eq!(session_a.id, session_b.id);
        assert_eq!(manager.active_pages(), 2);

        page_a.close().await;
        page_b.close().await;
        assert_eq!(manager.active_pages(), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_slot_empty() {
        let state = MockBrowser::new();
        state.failing_launches.store(1, Ordering::SeqCst);
        let (manager, _) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        let err = manager.acquire(&config).await.err().unwrap();
        assert!(matches!(err, RenderError::Launch(_)));
        assert!(!manager.has_session().await);

        let (_, page) = manager.acquire(&config).await.unwrap();
        page.close().await;
        assert_eq!(state.launches.load(Ordering::SeqCst), 2);
        assert_eq!(manager.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_session_is_replaced() {
        let state = MockBrowser::new();
        let (manager, _) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        let first = manager.session(&config).await.unwrap();
        state.connected.store(false, Ordering::SeqCst);
        let second = manager.session(&config).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(manager.launch_count(), 2);
    }

    #[tokio::test]
    async fn test_page_preparation_order() {
        let state = MockBrowser::new();
        let (manager, _) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        let (_, page) = manager.acquire(&config).await.unwrap();
        page.close().await;

        let agents = state.user_agents.lock().unwrap().clone();
        assert_eq!(agents.len(), 1);
        assert!(config.user_agents.contains(&agents[0]));

        let scripts = state.init_scripts.lock().unwrap().clone();
        assert_eq!(scripts, vec![STEALTH_BODY.to_string(), PROPERTY_OVERRIDES_SCRIPT.to_string()]);

        let headers = state.rewritten_headers.lock().unwrap().clone();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].len(), HEADER_PROFILE.len());
        assert_eq!(headers[0][0].1, HEADER_PROFILE[0].1);
    }

    #[tokio::test]
    async fn test_stealth_fetched_once() {
        let state = MockBrowser::new();
        let (manager, fetcher) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        for _ in 0..3 {
            let (_, page) = manager.acquire(&config).await.unwrap();
            page.close().await;
        }
        assert_eq!(fetcher.calls_for(DEFAULT_STEALTH_URL), 1);
        let scripts = state.init_scripts.lock().unwrap();
        assert_eq!(scripts.iter().filter(|s| *s == STEALTH_BODY).count(), 3);
    }

    #[tokio::test]
    async fn test_stealth_failure_degrades_and_is_memoized() {
        let state = MockBrowser::new();
        let (manager, fetcher) = manager(&state, MockFetcher::new());
        let config = BrowserConfiguration::default();

        for _ in 0..2 {
            let (_, page) = manager.acquire(&config).await.unwrap();
            page.close().await;
        }
        assert_eq!(fetcher.calls_for(DEFAULT_STEALTH_URL), 1);
        let scripts = state.init_scripts.lock().unwrap().clone();
        assert_eq!(
            scripts,
            vec![
                PROPERTY_OVERRIDES_SCRIPT.to_string(),
                PROPERTY_OVERRIDES_SCRIPT.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_stealth_disabled_skips_fetch() {
        let state = MockBrowser::new();
        let (manager, fetcher) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default().merge(&BrowserOverrides {
            stealth: Some(false),
            ..Default::default()
        });

        let (_, page) = manager.acquire(&config).await.unwrap();
        page.close().await;
        assert_eq!(fetcher.calls_for(DEFAULT_STEALTH_URL), 0);
        assert_eq!(state.init_scripts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_preparation_closes_tab() {
        let state = MockBrowser::new();
        state.fail_interception.store(true, Ordering::SeqCst);
        let (manager, _) = manager(&state, with_stealth());

        let err = manager.acquire(&BrowserConfiguration::default()).await.err().unwrap();
        assert!(matches!(err, RenderError::Page(_)));
        assert_eq!(state.open_pages(), 0);
        assert_eq!(manager.active_pages(), 0);
    }

    #[tokio::test]
    async fn test_render_returns_html_and_closes_tab() {
        let state = MockBrowser::new();
        state.set_html("<html><body><div id=\"root\">hydrated</div></body></html>");
        let (manager, _) = manager(&state, with_stealth());

        let html = manager
            .render(
                "https://app.test/",
                WaitUntil::NetworkIdle0,
                Duration::from_secs(5),
                &BrowserConfiguration::default(),
            )
            .await
            .unwrap();

        assert!(html.contains("hydrated"));
        assert_eq!(state.open_pages(), 0);
        assert_eq!(
            state.navigations.lock().unwrap().clone(),
            vec![("https://app.test/".to_string(), WaitUntil::NetworkIdle0)]
        );
    }

    #[tokio::test]
    async fn test_render_timeout_is_distinguishable() {
        let state = MockBrowser::new();
        state.navigate_delay_ms.store(500, Ordering::SeqCst);
        let (manager, _) = manager(&state, with_stealth());

        let err = manager
            .render(
                "https://slow.test/",
                WaitUntil::Load,
                Duration::from_millis(20),
                &BrowserConfiguration::default(),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err, RenderError::Timeout { timeout_ms: 20, .. }));
        assert_eq!(state.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_render_navigation_error_closes_tab() {
        let state = MockBrowser::new();
        state.fail_navigation.store(true, Ordering::SeqCst);
        let (manager, _) = manager(&state, with_stealth());

        let err = manager
            .render(
                "https://gone.test/",
                WaitUntil::Load,
                Duration::from_secs(5),
                &BrowserConfiguration::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(state.open_pages(), 0);
        // The session survives a failed navigation.
        assert!(manager.has_session().await);
    }

    #[tokio::test]
    async fn test_shutdown_clears_session() {
        let state = MockBrowser::new();
        let (manager, _) = manager(&state, with_stealth());
        let config = BrowserConfiguration::default();

        manager.session(&config).await.unwrap();
        manager.shutdown().await.unwrap();
        assert!(!manager.has_session().await);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);

        // Idempotent.
        manager.shutdown().await.unwrap();
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);

        manager.session(&config).await.unwrap();
        assert_eq!(manager.launch_count(), 2);
    }
}
