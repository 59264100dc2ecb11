//! In-memory fetcher and browser doubles shared by unit tests.

use crate::acquisition::PageFetcher;
use crate::config::BrowserConfiguration;
use crate::error::{NetworkError, RenderError};
use crate::renderer::{Launcher, NavigationResult, RenderContext, Renderer, WaitUntil};
use crate::stealth::headers::HeaderRewrite;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves canned bodies by URL and counts requests.
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_text(&self, url: &str, _timeout_ms: u64) -> Result<String, NetworkError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| NetworkError::Connect {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

/// Shared state of a fake browser, inspected by tests.
pub struct MockBrowser {
    pub launches: AtomicUsize,
    pub failing_launches: AtomicUsize,
    pub launch_delay_ms: AtomicU64,
    pub connected: AtomicBool,
    pub shutdowns: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_interception: AtomicBool,
    pub fail_navigation: AtomicBool,
    pub navigate_delay_ms: AtomicU64,
    pub html: Mutex<String>,
    pub user_agents: Mutex<Vec<String>>,
    pub init_scripts: Mutex<Vec<String>>,
    pub rewritten_headers: Mutex<Vec<Vec<(String, String)>>>,
    pub navigations: Mutex<Vec<(String, WaitUntil)>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self {
            launches: AtomicUsize::new(0),
            failing_launches: AtomicUsize::new(0),
            launch_delay_ms: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            shutdowns: AtomicUsize::new(0),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            fail_interception: AtomicBool::new(false),
            fail_navigation: AtomicBool::new(false),
            navigate_delay_ms: AtomicU64::new(0),
            html: Mutex::new("<html><body>rendered</body></html>".to_string()),
            user_agents: Mutex::new(Vec::new()),
            init_scripts: Mutex::new(Vec::new()),
            rewritten_headers: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }
}

impl MockBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_html(&self, html: &str) {
        *self.html.lock().unwrap() = html.to_string();
    }

    pub fn launcher(self: &Arc<Self>) -> Arc<MockLauncher> {
        Arc::new(MockLauncher(Arc::clone(self)))
    }

    pub fn open_pages(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockLauncher(pub Arc<MockBrowser>);

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self, _config: &BrowserConfiguration) -> Result<Arc<dyn Renderer>, RenderError> {
        let state = &self.0;
        let delay = state.launch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        state.launches.fetch_add(1, Ordering::SeqCst);
        let failing = state.failing_launches.load(Ordering::SeqCst);
        if failing > 0 {
            state.failing_launches.store(failing - 1, Ordering::SeqCst);
            return Err(RenderError::Launch("executable not found".to_string()));
        }
        state.connected.store(true, Ordering::SeqCst);
        Ok(Arc::new(MockRenderer(Arc::clone(state))))
    }
}

pub struct MockRenderer(Arc<MockBrowser>);

#[async_trait]
impl Renderer for MockRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext(Arc::clone(&self.0))))
    }

    fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        self.0.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.0.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockContext(Arc<MockBrowser>);

#[async_trait]
impl RenderContext for MockContext {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError> {
        self.0.user_agents.lock().unwrap().push(user_agent.to_string());
        Ok(())
    }

    async fn intercept_requests(&mut self, rewrite: HeaderRewrite) -> Result<(), RenderError> {
        if self.0.fail_interception.load(Ordering::SeqCst) {
            return Err(RenderError::Page("Fetch.enable failed".to_string()));
        }
        let sample = [("Accept".to_string(), "*/*".to_string())];
        self.0.rewritten_headers.lock().unwrap().push(rewrite(&sample));
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> Result<(), RenderError> {
        self.0.init_scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }

    async fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<NavigationResult, RenderError> {
        self.0
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), wait));
        let delay = self.0.navigate_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.0.fail_navigation.load(Ordering::SeqCst) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: delay,
        })
    }

    async fn get_html(&self) -> Result<String, RenderError> {
        Ok(self.0.html.lock().unwrap().clone())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
