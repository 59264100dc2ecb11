//! Outgoing request header profile.
//!
//! The interception hook on every rendered page passes the original request
//! headers through [`rewrite_headers`] and continues the request with the
//! result.

/// Headers forced onto every intercepted request, in emission order.
pub const HEADER_PROFILE: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Connection", "keep-alive"),
];

/// Signature of a header rewriting hook.
pub type HeaderRewrite = fn(&[(String, String)]) -> Vec<(String, String)>;

/// Drop any original header named in [`HEADER_PROFILE`] (case-insensitive),
/// keep the rest in their original order, then append the profile.
pub fn rewrite_headers(original: &[(String, String)]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = original
        .iter()
        .filter(|(name, _)| {
            !HEADER_PROFILE
                .iter()
                .any(|(forced, _)| forced.eq_ignore_ascii_case(name))
        })
        .cloned()
        .collect();

    out.extend(
        HEADER_PROFILE
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
    );
    out
}
