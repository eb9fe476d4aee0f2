//! Process-level plumbing shared by the binaries.
//!
//! This module provides signal handling (cancellation token plus exit status)
//! and pidfile bookkeeping.

pub mod pidfile;
pub mod shutdown;

// Re-export public API
pub use pidfile::{create_pidfile, remove_pidfile};
pub use shutdown::{watch_signals, RunOutcome};
