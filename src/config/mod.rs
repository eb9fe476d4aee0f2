//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults, limits)
//! - The `Config` option set and its validation

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
