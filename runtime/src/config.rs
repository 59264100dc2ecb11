//! Browser configuration: process defaults, environment overrides, and
//! per-call overrides merged into an immutable [`BrowserConfiguration`].

use crate::error::ConfigError;
use crate::stealth::fingerprint::DEFAULT_USER_AGENTS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default public location of the stealth evasion bundle.
pub const DEFAULT_STEALTH_URL: &str =
    "https://cdn.jsdelivr.net/gh/requireCool/stealth.min.js/stealth.min.js";

/// Default navigation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 800;

/// Fully resolved browser settings for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfiguration {
    /// Browser binary. `None` means auto-detect.
    pub executable_path: Option<PathBuf>,
    pub headless: bool,
    pub width: u32,
    pub height: u32,
    /// Pool the per-page user agent is drawn from.
    pub user_agents: Vec<String>,
    pub stealth: bool,
    pub stealth_url: String,
    /// Navigation timeout in milliseconds.
    pub timeout: u64,
}

impl Default for BrowserConfiguration {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: true,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            stealth: true,
            stealth_url: DEFAULT_STEALTH_URL.to_string(),
            timeout: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BrowserConfiguration {
    /// Defaults with `PAGESIFT_*` environment variables applied.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(p) = std::env::var("PAGESIFT_CHROMIUM_PATH") {
            if !p.trim().is_empty() {
                config.executable_path = Some(PathBuf::from(p.trim()));
            }
        }
        if let Some(v) = env_bool("PAGESIFT_HEADLESS") {
            config.headless = v;
        }
        if let Some(v) = env_bool("PAGESIFT_STEALTH") {
            config.stealth = v;
        }
        if let Ok(u) = std::env::var("PAGESIFT_STEALTH_URL") {
            if !u.trim().is_empty() {
                config.stealth_url = u.trim().to_string();
            }
        }
        if let Some(ms) = std::env::var("PAGESIFT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout = ms;
        }

        config
    }

    /// Apply per-call overrides on top of these settings.
    pub fn merge(&self, overrides: &BrowserOverrides) -> Self {
        Self {
            executable_path: overrides
                .executable_path
                .clone()
                .or_else(|| self.executable_path.clone()),
            headless: overrides.headless.unwrap_or(self.headless),
            width: overrides.width.unwrap_or(self.width),
            height: overrides.height.unwrap_or(self.height),
            user_agents: overrides
                .user_agents
                .clone()
                .unwrap_or_else(|| self.user_agents.clone()),
            stealth: overrides.stealth.unwrap_or(self.stealth),
            stealth_url: overrides
                .stealth_url
                .clone()
                .unwrap_or_else(|| self.stealth_url.clone()),
            timeout: overrides.timeout.unwrap_or(self.timeout),
        }
    }

    /// Reject values the browser layer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::NonPositiveTimeout);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        if self.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::EmptyUserAgents);
        }
        if self.stealth {
            url::Url::parse(&self.stealth_url).map_err(|e| ConfigError::InvalidStealthUrl {
                url: self.stealth_url.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Per-call overrides. Every field is optional; absent fields keep the
/// process default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserOverrides {
    pub executable_path: Option<PathBuf>,
    pub headless: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub user_agents: Option<Vec<String>>,
    pub stealth: Option<bool>,
    pub stealth_url: Option<String>,
    pub timeout: Option<u64>,
}

fn env_bool(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
