//! Classify raw HTML as static or dynamic (needs rendering).
//!
//! Scoring is additive over the signals in [`super::signals`]. The
//! classifier never fails: unparsable markup just yields fewer signals.

use super::signals::{
    Signal, DYNAMIC_THRESHOLD, HEAVY_INLINE_SCRIPT_BYTES, HEAVY_SCRIPT_MAX_TEXT_CHARS,
    HYDRATION_PATTERNS, KNOWN_GENERATORS, MOUNT_POINT_IDS, MOUNT_POINT_SUBSTRINGS,
    NEAR_EMPTY_MAX_CHILDREN, NEAR_EMPTY_TEXT_CHARS, NOSCRIPT_PROMPT_RE, SCORE_SCALE,
    SPARSE_TEXT_CHARS, SPARSE_TEXT_MIN_SCRIPTS,
};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Outcome of classifying one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_dynamic: bool,
    /// `min(score / 10, 1)` rounded to two decimals.
    pub confidence: f64,
    /// One entry per fired signal, in evaluation order.
    pub hints: Vec<String>,
    pub framework: Option<String>,
    /// Raw additive score before normalisation.
    pub score: u32,
}

/// Running score plus the reasons behind it.
#[derive(Default)]
struct Tally {
    score: u32,
    hints: Vec<String>,
}

impl Tally {
    fn fire(&mut self, signal: Signal, hint: impl Into<String>) {
        self.score += signal.weight();
        self.hints.push(hint.into());
    }
}

/// Score `html` for how likely it needs JavaScript rendering.
pub fn classify(html: &str) -> ClassificationResult {
    let document = Html::parse_document(html);
    let mut tally = Tally::default();

    // 1. Mount points
    if let Some(id) = find_mount_point(&document) {
        tally.fire(Signal::MountPoint, format!("SPA mount point #{id}"));
    }

    // 2. Hydration data, once per distinct pattern
    let mut hydration_framework = None;
    for pattern in HYDRATION_PATTERNS.iter() {
        if pattern.regex.is_match(html) {
            tally.fire(
                Signal::HydrationData,
                format!("hydration data: {}", pattern.label),
            );
            if hydration_framework.is_none() {
                hydration_framework = pattern.framework;
            }
        }
    }

    // 3. Framework DOM markers
    if has_match(&document, "[data-reactroot], [data-reactid]") {
        tally.fire(Signal::ReactMarker, "React root attribute");
    }
    if has_match(&document, "[data-server-rendered]") {
        tally.fire(Signal::ServerRenderedMarker, "server-rendered marker attribute");
    }
    if has_match(&document, "[ng-version]") {
        tally.fire(Signal::AngularMarker, "Angular version attribute");
    }

    // 4. Generator meta
    let generator = find_generator(&document);
    if let Some(name) = generator {
        tally.fire(Signal::GeneratorMeta, format!("generator meta: {name}"));
    }

    // 5. Text vs. scripts
    let body = first_match(&document, "body");
    let text_chars = body.map(visible_text_chars).unwrap_or(0);
    let (script_count, inline_script_bytes) = script_stats(&document);

    if text_chars < SPARSE_TEXT_CHARS && script_count >= SPARSE_TEXT_MIN_SCRIPTS {
        tally.fire(
            Signal::ScriptHeavyBody,
            format!("{text_chars} chars of body text with {script_count} scripts"),
        );
    }
    if inline_script_bytes > HEAVY_INLINE_SCRIPT_BYTES && text_chars < HEAVY_SCRIPT_MAX_TEXT_CHARS
    {
        tally.fire(
            Signal::LargeInlineScripts,
            format!("{inline_script_bytes} bytes of inline script with {text_chars} chars of text"),
        );
    }

    // 6. Noscript prompt
    if noscript_asks_for_javascript(&document) {
        tally.fire(Signal::NoscriptPrompt, "noscript asks to enable JavaScript");
    }

    // 7. Empty or near-empty body
    if let Some(body) = body {
        let children = body.children().filter_map(ElementRef::wrap).count();
        if children == 0 {
            tally.fire(Signal::EmptyBody, "body has no child elements");
        } else if children <= NEAR_EMPTY_MAX_CHILDREN && text_chars < NEAR_EMPTY_TEXT_CHARS {
            tally.fire(
                Signal::EmptyBody,
                format!("near-empty body: {children} children, {text_chars} chars of text"),
            );
        }
    }

    let confidence = confidence_from_score(tally.score);
    let framework = generator.or(hydration_framework).map(String::from);

    ClassificationResult {
        is_dynamic: confidence >= DYNAMIC_THRESHOLD,
        confidence,
        hints: tally.hints,
        framework,
        score: tally.score,
    }
}

/// `min(score / SCORE_SCALE, 1)` with two decimals, computed in hundredths
/// so the rounding is exact.
fn confidence_from_score(score: u32) -> f64 {
    let hundredths = (score.saturating_mul(100) / SCORE_SCALE).min(100);
    hundredths as f64 / 100.0
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    document.select(&sel).next()
}

fn has_match(document: &Html, selector: &str) -> bool {
    first_match(document, selector).is_some()
}

fn find_mount_point(document: &Html) -> Option<String> {
    let sel = Selector::parse("[id]").ok()?;
    document.select(&sel).find_map(|el| {
        let id = el.value().attr("id")?;
        let lower = id.to_ascii_lowercase();
        let hit = MOUNT_POINT_IDS.contains(&lower.as_str())
            || MOUNT_POINT_SUBSTRINGS.iter().any(|s| lower.contains(s));
        hit.then(|| id.to_string())
    })
}

fn find_generator(document: &Html) -> Option<&'static str> {
    let sel = Selector::parse("meta[name][content]").ok()?;
    document
        .select(&sel)
        .filter(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("generator"))
        })
        .find_map(|el| {
            let content = el.value().attr("content")?.to_ascii_lowercase();
            KNOWN_GENERATORS
                .iter()
                .find(|(needle, _)| content.contains(needle))
                .map(|(_, name)| *name)
        })
}

/// Returns (number of script elements, total bytes of inline script).
fn script_stats(document: &Html) -> (usize, usize) {
    let Ok(sel) = Selector::parse("script") else {
        return (0, 0);
    };
    document.select(&sel).fold((0, 0), |(count, bytes), el| {
        let inline = if el.value().attr("src").is_none() {
            el.text().map(str::len).sum::<usize>()
        } else {
            0
        };
        (count + 1, bytes + inline)
    })
}

fn noscript_asks_for_javascript(document: &Html) -> bool {
    let Ok(sel) = Selector::parse("noscript") else {
        return false;
    };
    document.select(&sel).any(|el| {
        let text: String = el.text().collect();
        NOSCRIPT_PROMPT_RE.is_match(&text)
    })
}

/// Length of the whitespace-normalised text a visitor would see, ignoring
/// script, style, noscript and template content.
fn visible_text_chars(el: ElementRef) -> usize {
    let mut raw = String::new();
    collect_visible_text(el, &mut raw);
    raw.split_whitespace()
        .map(|w| w.chars().count())
        .sum::<usize>()
        + raw.split_whitespace().count().saturating_sub(1)
}

fn collect_visible_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !matches!(
                child_el.value().name(),
                "script" | "style" | "noscript" | "template"
            ) {
                collect_visible_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}
