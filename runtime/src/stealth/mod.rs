//! Anti-detection measures applied to every rendered page.
//!
//! Picks a user agent per page, rewrites outgoing request headers to a
//! fixed browser-like profile, and registers scripts that mask automation
//! signals before any page script runs.

pub mod fingerprint;
pub mod headers;
pub mod script;
