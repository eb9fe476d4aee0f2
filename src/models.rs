use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Task payload: a JSON object as stored in the queue.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Detected tracking signatures of a landing page, keyed by signature name.
pub type Counters = BTreeMap<String, bool>;

/// Mechanism that produced one hop of a redirect chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum HopKind {
    /// Protocol-level redirect (`Location` header)
    #[serde(rename = "HTTP")]
    #[strum(serialize = "HTTP")]
    Http,
    /// HTML meta-refresh directive
    #[serde(rename = "META")]
    #[strum(serialize = "META")]
    Meta,
    /// `Location` pointing at an app-store deep link, rewritten to the store's web URL
    #[serde(rename = "MARKET->HTTP")]
    #[strum(serialize = "MARKET->HTTP")]
    MarketHttp,
    /// The fetch failed; always the last hop of a chain
    #[serde(rename = "ERROR")]
    #[strum(serialize = "ERROR")]
    Error,
}

/// A URL paired with the mechanism that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRecord {
    pub url: String,
    pub kind: HopKind,
}

impl HopRecord {
    pub fn new(url: impl Into<String>, kind: HopKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Outcome of one resolver fetch.
///
/// `next` is `None` on a terminal page (no redirect signal found).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub next: Option<HopRecord>,
    pub content: String,
}

/// Terminal state of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WalkStop {
    /// Reached a page with no further hop
    Done,
    /// A fetch failed
    ErrorStop,
    /// A hop pointed back at a URL already in the chain
    LoopStop,
    /// The hop budget was exhausted
    DepthStop,
    /// The request URL is on a terminal domain; nothing was fetched
    TerminalDomain,
}

/// Ordered hop history of one walk.
///
/// `urls[0]` is the request URL and `types.len() == urls.len() - 1`.
/// `counters` is present only when the walk stopped with `WalkStop::Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHistory {
    pub urls: Vec<String>,
    pub types: Vec<HopKind>,
    pub counters: Option<Counters>,
    pub stop: WalkStop,
}

impl RedirectHistory {
    /// True when the last recorded hop failed.
    pub fn is_error(&self) -> bool {
        self.types.last() == Some(&HopKind::Error)
    }
}
