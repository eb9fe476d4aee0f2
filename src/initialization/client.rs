//! HTTP client initialization.
//!
//! Three clients are built from the same `Config`: one for redirect
//! resolution, one for the network health probe, one for callback delivery.

use std::sync::Arc;

use crate::config::Config;
use crate::error_handling::InitializationError;
use reqwest::ClientBuilder;

/// Initializes the HTTP client used for redirect resolution.
///
/// Redirect following is disabled so every `Location` is observed as its own
/// hop. The User-Agent is applied per request by the resolver, not here.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_redirect_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(config.http_timeout())
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the client used by the supervisor's network health probe.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_probe_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(config.http_timeout())
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the client used for callback deliveries.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_push_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(config.http_connection_timeout())
        .build()?;
    Ok(Arc::new(client))
}
