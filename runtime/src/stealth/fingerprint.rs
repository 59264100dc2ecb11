//! Browser fingerprint patching: hide automation signals.

use rand::seq::SliceRandom;

/// Built-in pool of realistic desktop user agents.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
];

/// Runs before any page script: `navigator.webdriver` reports false and
/// `navigator.plugins` is a non-empty placeholder.
pub const PROPERTY_OVERRIDES_SCRIPT: &str = r#"
(() => {
    Object.defineProperty(navigator, 'webdriver', {
        get: () => false,
        configurable: true,
    });

    Object.defineProperty(navigator, 'plugins', {
        get: () => [1, 2, 3, 4, 5],
        configurable: true,
    });
})();
"#;

/// Pick one user agent uniformly at random, skipping blank entries.
///
/// Returns `None` only when the pool has no usable entry.
pub fn pick_user_agent(pool: &[String]) -> Option<&str> {
    let usable: Vec<&String> = pool.iter().filter(|ua| !ua.trim().is_empty()).collect();
    let mut rng = rand::thread_rng();
    usable.choose(&mut rng).map(|ua| ua.as_str())
}
