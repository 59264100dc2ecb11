//! Body text extraction and normalization.
//!
//! Rendered SPA pages often leak serialized state into the body text, so
//! the raw text is unescaped, hydration assignments are dropped, and
//! whitespace is collapsed before it is returned.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// `window.__INITIAL_STATE__ = JSON.parse(...);` and friends. The argument
/// runs to the first closing parenthesis, which may be on a later line.
static HYDRATION_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:window\.)?__[A-Z][A-Z0-9_]*__\s*=\s*JSON\.parse\([^)]*\)\s*;?").unwrap()
});

/// Horizontal whitespace on either side of a newline.
static AROUND_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]*\n[^\S\n]*").unwrap());

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static HORIZONTAL_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Normalized text of the `<body>` element, or an empty string.
pub fn extract_text(document: &Html) -> String {
    let raw = match Selector::parse("body") {
        Ok(sel) => document
            .select(&sel)
            .next()
            .map(|body| body.text().collect::<String>())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    normalize_text(&raw)
}

/// Apply the text cleanup pipeline to raw body text.
pub fn normalize_text(raw: &str) -> String {
    let text = unescape_sequences(raw);
    let text = HYDRATION_ASSIGNMENT_RE.replace_all(&text, "");
    let text = AROUND_NEWLINE_RE.replace_all(&text, "\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    let text = HORIZONTAL_WS_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Replace the literal sequences `\"`, `\\`, `\n` and `\t`, in that
/// order. A doubled backslash therefore still resolves with the escape
/// that follows it, so `\\n` ends up as a newline.
fn unescape_sequences(input: &str) -> String {
    input
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}
