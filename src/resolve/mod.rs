//! Redirect resolution primitives.
//!
//! This module provides:
//! - Single-hop HTTP resolution (`Resolver`, `HttpResolver`)
//! - Meta-refresh target extraction
//! - App-store deep link normalization
//! - URL preparation and terminal-domain matching
//! - Tracking counter detection

mod counters;
mod http;
mod market;
mod meta;
mod url;

// Re-export public API
pub use counters::{detect_counters, CounterSignature, COUNTER_SIGNATURES};
pub use http::{resolve, HttpResolver, Resolver};
pub use market::{fix_market_url, is_market_url};
pub use meta::extract_meta_redirect;
pub use url::{is_terminal_domain, join_url, prepare_url};
