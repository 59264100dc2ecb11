//! Scoped ownership of a prepared browser tab.

use crate::renderer::RenderContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A tab borrowed from the shared browser session.
///
/// Close it with [`PageHandle::close`]. A handle that is dropped instead
/// (early return, panic, cancelled future) schedules the close on the
/// current tokio runtime.
pub struct PageHandle {
    context: Option<Box<dyn RenderContext>>,
    active_pages: Arc<AtomicUsize>,
}

impl PageHandle {
    pub(crate) fn new(context: Box<dyn RenderContext>, active_pages: Arc<AtomicUsize>) -> Self {
        active_pages.fetch_add(1, Ordering::SeqCst);
        Self {
            context: Some(context),
            active_pages,
        }
    }

    /// Get a reference to the render context.
    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref().expect("page already closed").as_ref()
    }

    /// Get a mutable reference to the render context.
    pub fn context_mut(&mut self) -> &mut dyn RenderContext {
        self.context.as_mut().expect("page already closed").as_mut()
    }

    /// Close the tab. Close failures are logged, not returned.
    pub async fn close(mut self) {
        if let Some(context) = self.context.take() {
            let result = context.close().await;
            self.active_pages.fetch_sub(1, Ordering::SeqCst);
            if let Err(e) = result {
                warn!("failed to close page: {e}");
            }
        }
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        self.active_pages.fetch_sub(1, Ordering::SeqCst);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = context.close().await {
                        debug!("deferred page close failed: {e}");
                    }
                });
            }
            Err(_) => warn!("page handle dropped outside a runtime, tab left open"),
        }
    }
}
