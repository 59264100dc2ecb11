//! Document metadata: title, description, link relations, Open Graph and
//! Twitter card tags, and the declared character set.

use super::content::extract_title;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

const DEFAULT_CHARSET: &str = "utf-8";

/// Metadata found in the document head. Absent tags are `None` and are
/// omitted when serialized; `charset` and `title` always have a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub charset: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_creator: Option<String>,
}

pub fn extract_metadata(document: &Html) -> PageMetadata {
    PageMetadata {
        charset: charset(document),
        title: extract_title(document),
        description: meta_name(document, "description"),
        keywords: meta_name(document, "keywords"),
        author: meta_name(document, "author"),
        robots: meta_name(document, "robots"),
        canonical: link_rel(document, "canonical"),
        alternate: link_rel(document, "alternate"),
        next: link_rel(document, "next"),
        prev: link_rel(document, "prev"),
        og_title: meta_property(document, "og:title"),
        og_description: meta_property(document, "og:description"),
        og_image: meta_property(document, "og:image"),
        og_url: meta_property(document, "og:url"),
        og_type: meta_property(document, "og:type"),
        og_site_name: meta_property(document, "og:site_name"),
        twitter_card: twitter(document, "twitter:card"),
        twitter_title: twitter(document, "twitter:title"),
        twitter_description: twitter(document, "twitter:description"),
        twitter_image: twitter(document, "twitter:image"),
        twitter_site: twitter(document, "twitter:site"),
        twitter_creator: twitter(document, "twitter:creator"),
    }
}

/// First non-empty `attr` among the elements matching `css`.
fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    document
        .select(&sel)
        .find_map(|el| el.value().attr(attr).and_then(non_empty))
}

fn meta_name(document: &Html, name: &str) -> Option<String> {
    first_attr(document, &format!(r#"meta[name="{name}" i]"#), "content")
}

/// Open Graph style tag: `content`, or `href` when a tag carries no content.
fn meta_property(document: &Html, property: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[property="{property}" i]"#)).ok()?;
    document.select(&sel).find_map(|el| {
        let v = el.value();
        v.attr("content")
            .or_else(|| v.attr("href"))
            .and_then(non_empty)
    })
}

// Twitter cards are specified with `name=`, but `property=` is common in
// the wild and read first.
fn twitter(document: &Html, key: &str) -> Option<String> {
    meta_property(document, key).or_else(|| meta_name(document, key))
}

fn link_rel(document: &Html, rel: &str) -> Option<String> {
    first_attr(document, &format!(r#"link[rel~="{rel}" i][href]"#), "href")
}

fn charset(document: &Html) -> String {
    if let Some(cs) = first_attr(document, "meta[charset]", "charset") {
        return cs;
    }
    if let Ok(sel) = Selector::parse("meta[http-equiv][content]") {
        for el in document.select(&sel) {
            let is_content_type = el
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("content-type"));
            if !is_content_type {
                continue;
            }
            if let Some(cs) = el.value().attr("content").and_then(charset_from_content_type) {
                return cs;
            }
        }
    }
    DEFAULT_CHARSET.to_string()
}

/// `text/html; charset=ISO-8859-1` -> `ISO-8859-1`.
fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (key, val) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        non_empty(val.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
