//! Adaptive web content extraction.
//!
//! A page is fetched statically and scored for how likely it is to need
//! JavaScript rendering. Pages that do are rendered in a shared Chromium
//! session before titles, links, images, metadata or body text are
//! extracted.

pub mod acquisition;
pub mod classification;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod orchestrator;
pub mod pool;
pub mod renderer;
pub mod stealth;

#[cfg(test)]
pub(crate) mod testing;

pub use classification::{classify, ClassificationResult};
pub use config::{BrowserConfiguration, BrowserOverrides};
pub use error::{ConfigError, ExtractError, NetworkError, NetworkErrorKind, RenderError};
pub use extraction::{ExtractionKind, ExtractionResult};
pub use orchestrator::{ExtractOptions, ExtractionOrchestrator};
