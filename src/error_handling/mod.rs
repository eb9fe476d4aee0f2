//! Error handling.
//!
//! This module provides:
//! - Error type definitions for requests, queue operations, configuration and startup
//! - Categorization of `reqwest` failures
//! - Retry strategy for establishing queue connections

mod categorization;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, get_retry_strategy};
pub use types::{
    ConfigError, InitializationError, QueueError, RequestError, RequestErrorKind,
};
