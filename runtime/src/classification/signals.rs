//! Signal table for the rendering classifier.
//!
//! Every heuristic the classifier evaluates is a [`Signal`] with a fixed
//! integer weight. Confidence is `min(score / SCORE_SCALE, 1)`.

use regex::Regex;
use std::sync::LazyLock;

/// Score that maps to confidence 1.0.
pub const SCORE_SCALE: u32 = 10;

/// Confidence at or above which a page is considered dynamic.
pub const DYNAMIC_THRESHOLD: f64 = 0.3;

/// Visible body text below this, together with enough scripts, is suspicious.
pub const SPARSE_TEXT_CHARS: usize = 100;
pub const SPARSE_TEXT_MIN_SCRIPTS: usize = 3;

/// Inline script volume that dwarfs a short body.
pub const HEAVY_INLINE_SCRIPT_BYTES: usize = 50_000;
pub const HEAVY_SCRIPT_MAX_TEXT_CHARS: usize = 500;

/// A body with at most this many children and less text than
/// [`NEAR_EMPTY_TEXT_CHARS`] counts as near-empty.
pub const NEAR_EMPTY_MAX_CHILDREN: usize = 2;
pub const NEAR_EMPTY_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Element id used by SPA frameworks as a mount point.
    MountPoint,
    /// One distinct hydration-data global. Fires once per pattern.
    HydrationData,
    /// `data-reactroot` / `data-reactid`.
    ReactMarker,
    /// `data-server-rendered`.
    ServerRenderedMarker,
    /// `ng-version`.
    AngularMarker,
    /// `<meta name="generator">` naming a known framework.
    GeneratorMeta,
    /// Almost no text but several scripts.
    ScriptHeavyBody,
    /// Huge inline scripts next to a short body.
    LargeInlineScripts,
    /// `<noscript>` asking the visitor to enable JavaScript.
    NoscriptPrompt,
    /// Body with no child elements, or a couple of nearly textless ones.
    EmptyBody,
}

pub const SIGNAL_WEIGHTS: &[(Signal, u32)] = &[
    (Signal::MountPoint, 3),
    (Signal::HydrationData, 2),
    (Signal::ReactMarker, 2),
    (Signal::ServerRenderedMarker, 1),
    (Signal::AngularMarker, 1),
    (Signal::GeneratorMeta, 2),
    (Signal::ScriptHeavyBody, 2),
    (Signal::LargeInlineScripts, 2),
    (Signal::NoscriptPrompt, 1),
    (Signal::EmptyBody, 3),
];

impl Signal {
    pub fn weight(self) -> u32 {
        SIGNAL_WEIGHTS
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }
}

/// Mount-point ids matched exactly (case-insensitive).
pub const MOUNT_POINT_IDS: &[&str] = &["root", "app", "__next", "nuxt", "__nuxt"];

/// Mount-point ids distinctive enough to also match as a substring.
pub const MOUNT_POINT_SUBSTRINGS: &[&str] = &["__next", "__nuxt", "nuxt"];

/// Generator meta values (lowercase needle, display name).
pub const KNOWN_GENERATORS: &[(&str, &str)] = &[
    ("next.js", "Next.js"),
    ("nuxt", "Nuxt"),
    ("gatsby", "Gatsby"),
    ("gridsome", "Gridsome"),
    ("vuepress", "VuePress"),
    ("docusaurus", "Docusaurus"),
    ("astro", "Astro"),
    ("sveltekit", "SvelteKit"),
    ("remix", "Remix"),
    ("angular", "Angular"),
];

/// A framework hydration-data marker.
pub struct HydrationPattern {
    pub label: &'static str,
    /// Framework named by a match. Library-level state blobs name none.
    pub framework: Option<&'static str>,
    pub regex: Regex,
}

/// Hydration markers in framework precedence order.
pub static HYDRATION_PATTERNS: LazyLock<Vec<HydrationPattern>> = LazyLock::new(|| {
    let table: &[(&str, Option<&str>, &str)] = &[
        ("Next.js data", Some("Next.js"), r"__NEXT_DATA__"),
        ("Nuxt state", Some("Nuxt"), r"__NUXT__"),
        ("Vue marker", Some("Vue"), r"__VUE(?:_SSR_CONTEXT)?__|__vue_app__"),
        ("initial state", None, r"__INITIAL_STATE__"),
        ("Apollo cache", None, r"__APOLLO_STATE__"),
        ("Redux state", None, r"__PRELOADED_STATE__|__REDUX_STATE__"),
    ];
    table
        .iter()
        .map(|(label, framework, pattern)| HydrationPattern {
            label: *label,
            framework: *framework,
            regex: Regex::new(pattern).unwrap(),
        })
        .collect()
});

pub static NOSCRIPT_PROMPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(enable|turn on|activate|allow)\s+javascript|javascript\s+(is\s+)?(required|disabled|needed|turned off)|requires?\s+javascript",
    )
    .unwrap()
});
