//! Structured content extraction from HTML.
//!
//! Every extractor is a pure function of the parsed document and the
//! [`ExtractionOptions`]; none of them fail. Missing elements give empty
//! strings, empty lists or absent metadata fields.

pub mod content;
pub mod metadata;
pub mod text;

use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use metadata::PageMetadata;

/// Default cap on returned links and images.
pub const DEFAULT_ITEM_CAP: usize = 10;

/// The output shape a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionKind {
    Summary,
    Metadata,
    Links,
    Text,
}

impl ExtractionKind {
    /// Whether this kind may be served from rendered HTML. Summary and
    /// metadata are cheap previews and always use the static fetch.
    pub fn may_render(self) -> bool {
        matches!(self, ExtractionKind::Links | ExtractionKind::Text)
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionKind::Summary => "summary",
            ExtractionKind::Metadata => "metadata",
            ExtractionKind::Links => "links",
            ExtractionKind::Text => "text",
        };
        f.write_str(s)
    }
}

impl FromStr for ExtractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ExtractionKind::Summary),
            "metadata" => Ok(ExtractionKind::Metadata),
            "links" => Ok(ExtractionKind::Links),
            "text" => Ok(ExtractionKind::Text),
            other => Err(format!(
                "unknown extraction kind '{other}' (expected summary, metadata, links or text)"
            )),
        }
    }
}

/// Caps applied to list outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionOptions {
    pub link_cap: usize,
    pub image_cap: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            link_cap: DEFAULT_ITEM_CAP,
            image_cap: DEFAULT_ITEM_CAP,
        }
    }
}

/// An anchor with a non-empty href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub href: String,
}

/// An image with a non-empty src.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub title: String,
    pub src: String,
}

/// One result per [`ExtractionKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractionResult {
    Summary {
        url: String,
        title: String,
        links: Vec<Link>,
        images: Vec<Image>,
    },
    Metadata(PageMetadata),
    Links {
        links: Vec<Link>,
    },
    Text {
        text: String,
    },
}

impl ExtractionResult {
    pub fn kind(&self) -> ExtractionKind {
        match self {
            ExtractionResult::Summary { .. } => ExtractionKind::Summary,
            ExtractionResult::Metadata(_) => ExtractionKind::Metadata,
            ExtractionResult::Links { .. } => ExtractionKind::Links,
            ExtractionResult::Text { .. } => ExtractionKind::Text,
        }
    }
}

/// Parse `html` and build the result for `kind`.
pub fn extract(html: &str, url: &str, kind: ExtractionKind, options: &ExtractionOptions) -> ExtractionResult {
    let document = Html::parse_document(html);
    extract_from_document(&document, url, kind, options)
}

/// Build the result for `kind` from an already parsed document.
pub fn extract_from_document(
    document: &Html,
    url: &str,
    kind: ExtractionKind,
    options: &ExtractionOptions,
) -> ExtractionResult {
    match kind {
        ExtractionKind::Summary => ExtractionResult::Summary {
            url: url.to_string(),
            title: content::extract_title(document),
            links: content::extract_links(document, options.link_cap),
            images: content::extract_images(document, options.image_cap),
        },
        ExtractionKind::Metadata => ExtractionResult::Metadata(metadata::extract_metadata(document)),
        ExtractionKind::Links => ExtractionResult::Links {
            links: content::extract_links(document, options.link_cap),
        },
        ExtractionKind::Text => ExtractionResult::Text {
            text: text::extract_text(document),
        },
    }
}
