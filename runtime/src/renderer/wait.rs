//! Navigation wait policies and the network-idle tracker behind them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// How long the network must stay under the in-flight threshold.
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitUntil {
    /// The `load` event fired.
    #[serde(rename = "load")]
    Load,
    /// The `DOMContentLoaded` event fired.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No requests in flight for [`NETWORK_IDLE_WINDOW`].
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    /// At most two requests in flight for [`NETWORK_IDLE_WINDOW`].
    #[default]
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

impl WaitUntil {
    /// In-flight request threshold for the network-idle policies.
    pub fn max_inflight(self) -> Option<usize> {
        match self {
            WaitUntil::NetworkIdle0 => Some(0),
            WaitUntil::NetworkIdle2 => Some(2),
            WaitUntil::Load | WaitUntil::DomContentLoaded => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle0 => "networkidle0",
            WaitUntil::NetworkIdle2 => "networkidle2",
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitUntil {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(WaitUntil::Load),
            "domcontentloaded" => Ok(WaitUntil::DomContentLoaded),
            "networkidle0" => Ok(WaitUntil::NetworkIdle0),
            "networkidle2" => Ok(WaitUntil::NetworkIdle2),
            other => Err(format!(
                "unknown wait policy '{other}' (expected load, domcontentloaded, networkidle0 or networkidle2)"
            )),
        }
    }
}

/// Request lifecycle events relevant to idle detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    Finished(String),
}

/// Tracks in-flight requests and reports when the page has been quiet
/// (at most `max_inflight` requests outstanding) for the idle window.
#[derive(Debug)]
pub struct IdleTracker {
    inflight: HashSet<String>,
    max_inflight: usize,
    window: Duration,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(max_inflight: usize, window: Duration, now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            max_inflight,
            window,
            quiet_since: Some(now),
        }
    }

    pub fn observe(&mut self, event: NetworkEvent, now: Instant) {
        match event {
            NetworkEvent::Started(id) => {
                self.inflight.insert(id);
            }
            NetworkEvent::Finished(id) => {
                self.inflight.remove(&id);
            }
        }
        if self.inflight.len() > self.max_inflight {
            self.quiet_since = None;
        } else if self.quiet_since.is_none() {
            self.quiet_since = Some(now);
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// The instant the idle window completes if nothing else happens, or
    /// `None` while too many requests are outstanding.
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.quiet_since.map(|since| since + self.window)
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        self.idle_deadline().is_some_and(|deadline| now >= deadline)
    }
}
