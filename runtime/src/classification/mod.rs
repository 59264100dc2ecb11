//! Decide from raw HTML whether a page needs JavaScript rendering.

pub mod page_classifier;
pub mod signals;

pub use page_classifier::{classify, ClassificationResult};
