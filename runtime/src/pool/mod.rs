//! Browser session and tab lifecycle.

pub mod manager;
pub mod page;

pub use manager::{BrowserSession, BrowserSessionManager};
pub use page::PageHandle;
