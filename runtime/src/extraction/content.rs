//! Title, link and image extraction.

use super::{Image, Link};
use scraper::{ElementRef, Html, Selector};

/// Trimmed text of the first `<title>`, or an empty string.
pub fn extract_title(document: &Html) -> String {
    let Ok(sel) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Anchors with a non-empty href, in document order, at most `cap`.
///
/// The label is the `title` attribute when non-empty, else the trimmed
/// text content. Duplicates are kept.
pub fn extract_links(document: &Html, cap: usize) -> Vec<Link> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let title = non_empty_attr(&a, "title")
                .unwrap_or_else(|| a.text().collect::<String>().trim().to_string());
            Some(Link {
                title,
                href: href.to_string(),
            })
        })
        .take(cap)
        .collect()
}

/// Images with a non-empty src, in document order, at most `cap`.
///
/// The label is `alt`, then `title`, then empty.
pub fn extract_images(document: &Html, cap: usize) -> Vec<Image> {
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            let title = non_empty_attr(&img, "alt")
                .or_else(|| non_empty_attr(&img, "title"))
                .unwrap_or_default();
            Some(Image {
                title,
                src: src.to_string(),
            })
        })
        .take(cap)
        .collect()
}

fn non_empty_attr(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
