//! redirect_checker library: redirect chain checking and callback delivery
//!
//! Two queue-driven services share this crate:
//! - the **checker** follows the redirect chain of every URL taken from its
//!   input tube (protocol `Location`, meta-refresh, app-store deep links),
//!   detects tracking counters on the landing page and publishes the hop
//!   history to its output tube, or requeues the task when a fetch failed
//! - the **pusher** delivers queued payloads to their HTTP callbacks and acks or
//!   buries each task depending on the outcome
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use redirect_checker::{get_redirect_history, Config, HttpResolver, WalkOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let client = redirect_checker::initialization::init_redirect_client(&config)?;
//! let resolver = HttpResolver::from_config(Arc::clone(&client), &config);
//!
//! let history = get_redirect_history(
//!     &resolver,
//!     "http://example.com/ad",
//!     &WalkOptions::from_config(&config),
//! )
//! .await;
//! println!("{:?} via {:?}", history.urls, history.types);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod app;
pub mod checker;
pub mod config;
pub mod error_handling;
pub mod history;
pub mod initialization;
pub mod models;
pub mod pusher;
pub mod queue;
pub mod resolve;

// Re-export public API
pub use app::RunOutcome;
pub use config::{Config, LogFormat, LogLevel};
pub use history::{get_redirect_history, WalkOptions};
pub use models::{Counters, HopKind, HopRecord, Payload, RedirectHistory, Resolution, WalkStop};
pub use queue::{MemoryTube, PutOptions, RedisTube, Task, TaskAction, Tube};
pub use resolve::{
    detect_counters, extract_meta_redirect, fix_market_url, prepare_url, HttpResolver, Resolver,
};
