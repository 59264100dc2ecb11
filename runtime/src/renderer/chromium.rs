//! Chromium renderer over the DevTools protocol (chromiumoxide).

use super::wait::{IdleTracker, NetworkEvent, WaitUntil, NETWORK_IDLE_WINDOW};
use super::{Launcher, NavigationResult, RenderContext, Renderer};
use crate::config::BrowserConfiguration;
use crate::error::RenderError;
use crate::stealth::headers::HeaderRewrite;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused, HeaderEntry,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventDomContentEventFired, NavigateParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Binary names looked up on `PATH`, in order.
const CHROMIUM_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Slack added to the CDP command timeout so the caller's navigation
/// timeout always fires first and surfaces as [`RenderError::Timeout`].
const CDP_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Find a Chromium binary: `PAGESIFT_CHROMIUM_PATH`, then
/// `~/.pagesift/chromium/`, then the system `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PAGESIFT_CHROMIUM_PATH") {
        let path = PathBuf::from(p.trim());
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".pagesift/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pagesift/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".pagesift/chromium/chrome"),
                home.join(".pagesift/chromium/chrome-linux64/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    CHROMIUM_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Extra command-line flags for every launch.
pub fn launch_args(config: &BrowserConfiguration) -> Vec<String> {
    vec![
        format!("--window-size={},{}", config.width, config.height),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
    ]
}

/// Per-command CDP timeout for a session.
fn cdp_request_timeout(config: &BrowserConfiguration) -> Duration {
    config.navigation_timeout() + CDP_TIMEOUT_MARGIN
}

fn build_config(config: &BrowserConfiguration, executable: Option<PathBuf>) -> Result<BrowserConfig, RenderError> {
    let viewport = Viewport {
        width: config.width,
        height: config.height,
        device_scale_factor: None,
        emulating_mobile: false,
        is_landscape: config.width >= config.height,
        has_touch: false,
    };

    let mut builder = BrowserConfig::builder();
    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }
    let builder = builder
        .viewport(viewport)
        .args(launch_args(config))
        .request_timeout(cdp_request_timeout(config));
    let builder = if config.headless {
        builder
    } else {
        builder.with_head()
    };

    builder.build().map_err(RenderError::Launch)
}

fn page_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Page(err.to_string())
}

/// Launches local Chromium processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn launch(&self, config: &BrowserConfiguration) -> Result<Arc<dyn Renderer>, RenderError> {
        let executable = config.executable_path.clone().or_else(find_chromium);
        match &executable {
            Some(path) => info!(path = %path.display(), headless = config.headless, "launching chromium"),
            None => warn!("no chromium binary found, falling back to chromiumoxide detection"),
        }

        let browser_config = build_config(config, executable)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let connected = Arc::new(AtomicBool::new(true));
        let handler_connected = Arc::clone(&connected);
        let handler_task = tokio::spawn(async move {
            while let Some(result) = handler.next().await {
                if let Err(err) = result {
                    debug!("chromium handler error: {err}");
                }
            }
            handler_connected.store(false, Ordering::SeqCst);
            debug!("chromium handler exited");
        });

        Ok(Arc::new(ChromiumRenderer {
            browser: Mutex::new(browser),
            handler: handler_task,
            connected,
        }))
    }
}

/// A running Chromium process.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(page_error)?;
        Ok(Box::new(ChromiumContext {
            page,
            interception: None,
        }))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.handler.is_finished()
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(page_error);
        if let Err(e) = browser.wait().await {
            debug!("waiting for chromium exit failed: {e}");
        }
        self.handler.abort();
        self.connected.store(false, Ordering::SeqCst);
        closed.map(|_| ())
    }
}

/// One Chromium tab.
pub struct ChromiumContext {
    page: Page,
    interception: Option<JoinHandle<()>>,
}

impl ChromiumContext {
    async fn navigate_and_wait_for_dom(&self, url: &str) -> Result<(), RenderError> {
        let mut fired = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(page_error)?;
        self.navigate_raw(url).await?;
        fired.next().await;
        Ok(())
    }

    async fn navigate_and_wait_for_idle(&self, url: &str, max_inflight: usize) -> Result<(), RenderError> {
        self.page
            .execute(NetworkEnableParams::default())
            .await
            .map_err(page_error)?;

        let started = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(page_error)?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(page_error)?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(page_error)?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
        let mut events: BoxStream<'static, NetworkEvent> =
            stream::select(started, stream::select(finished, failed)).boxed();

        self.navigate_raw(url).await?;

        let mut tracker = IdleTracker::new(max_inflight, NETWORK_IDLE_WINDOW, Instant::now());
        loop {
            match tracker.idle_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        event = events.next() => match event {
                            Some(event) => tracker.observe(event, Instant::now()),
                            None => return Ok(()),
                        },
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                            debug!(url, inflight = tracker.inflight(), "network idle");
                            return Ok(());
                        }
                    }
                }
                None => match events.next().await {
                    Some(event) => tracker.observe(event, Instant::now()),
                    None => return Ok(()),
                },
            }
        }
    }

    async fn navigate_raw(&self, url: &str) -> Result<(), RenderError> {
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        if let Some(error_text) = response.result.error_text.clone() {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: error_text,
            });
        }
        Ok(())
    }
}

/// Flatten a CDP header object into ordered name/value pairs.
fn header_pairs(headers: &serde_json::Value) -> Vec<(String, String)> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(name, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError> {
        self.page.set_user_agent(user_agent).await.map_err(page_error)?;
        Ok(())
    }

    async fn intercept_requests(&mut self, rewrite: HeaderRewrite) -> Result<(), RenderError> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(page_error)?;
        self.page
            .execute(FetchEnableParams::default())
            .await
            .map_err(page_error)?;

        let page = self.page.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let headers = rewrite(&header_pairs(event.request.headers.inner()));
                let params = ContinueRequestParams::builder()
                    .request_id(event.request_id.clone())
                    .headers(headers.into_iter().map(|(name, value)| HeaderEntry::new(name, value)))
                    .build()
                    .unwrap_or_else(|e| {
                        warn!("dropping header rewrite: {e}");
                        ContinueRequestParams::new(event.request_id.clone())
                    });
                if let Err(e) = page.execute(params).await {
                    debug!(url = %event.request.url, "continue request failed: {e}");
                }
            }
        });
        if let Some(previous) = self.interception.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> Result<(), RenderError> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(page_error)?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<NavigationResult, RenderError> {
        let start = Instant::now();
        match wait {
            WaitUntil::Load => {
                self.page.goto(url).await.map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            }
            WaitUntil::DomContentLoaded => self.navigate_and_wait_for_dom(url).await?,
            WaitUntil::NetworkIdle0 | WaitUntil::NetworkIdle2 => {
                let max_inflight = wait.max_inflight().unwrap_or(0);
                self.navigate_and_wait_for_idle(url, max_inflight).await?
            }
        }

        let final_url = self
            .page
            .url()
            .await
            .map_err(page_error)?
            .unwrap_or_else(|| url.to_string());
        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn get_html(&self) -> Result<String, RenderError> {
        self.page.content().await.map_err(page_error)
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        if let Some(task) = &self.interception {
            task.abort();
        }
        self.page.clone().close().await.map_err(page_error)
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        if let Some(task) = self.interception.take() {
            task.abort();
        }
    }
}
