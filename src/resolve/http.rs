//! Single-hop redirect resolution over HTTP.
//!
//! One fetch per call: the protocol-level `Location` wins, otherwise the body
//! is searched for a meta-refresh directive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{LOCATION, USER_AGENT};

use super::market::{fix_market_url, is_market_url};
use super::meta::extract_meta_redirect;
use super::url::{join_url, prepare_url};
use crate::config::{Config, MAX_RESPONSE_BODY_SIZE};
use crate::error_handling::RequestError;
use crate::models::{HopKind, HopRecord, Resolution};

/// Resolves one hop of a redirect chain.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Fetches `url` once and classifies what it points to next.
    ///
    /// # Errors
    ///
    /// Returns a `RequestError` on timeout, connection or protocol failure;
    /// no partial resolution is returned in that case.
    async fn resolve(&self, url: &str) -> Result<Resolution, RequestError>;
}

/// `Resolver` backed by a `reqwest::Client` with redirect following disabled.
#[derive(Clone)]
pub struct HttpResolver {
    client: Arc<reqwest::Client>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpResolver {
    pub fn new(client: Arc<reqwest::Client>, timeout: Duration, user_agent: Option<String>) -> Self {
        Self {
            client,
            timeout,
            user_agent,
        }
    }

    /// Builds a resolver from the timeout and User-Agent options of `config`.
    pub fn from_config(client: Arc<reqwest::Client>, config: &Config) -> Self {
        Self::new(
            client,
            config.http_timeout(),
            config.user_agent().map(str::to_string),
        )
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Result<Resolution, RequestError> {
        resolve(&self.client, url, self.timeout, self.user_agent.as_deref()).await
    }
}

/// Fetches `url` and returns the next hop (if any) together with the body.
///
/// Only 301, 302, 303, 307 and 308 responses carrying a `Location` header
/// count as protocol redirects. A `Location` with the market scheme is
/// rewritten onto the store's web URL and tagged `MARKET->HTTP`; a market
/// meta-refresh target is rewritten the same way but stays `META`.
///
/// # Errors
///
/// Returns a `RequestError` if sending the request or reading the body fails.
pub async fn resolve(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<Resolution, RequestError> {
    let mut request = client.get(url).timeout(timeout);
    if let Some(user_agent) = user_agent {
        request = request.header(USER_AGENT, user_agent);
    }

    let mut response = request
        .send()
        .await
        .map_err(|e| RequestError::from_reqwest(url, e))?;

    let status_code = response.status().as_u16();
    let location = if matches!(status_code, 301 | 302 | 303 | 307 | 308) {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if location.is_none() {
            log::warn!(
                "Redirect status {} for {} but no usable Location header",
                status_code,
                url
            );
        }
        location
    } else {
        None
    };

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| RequestError::from_reqwest(url, e))?
    {
        let remaining = MAX_RESPONSE_BODY_SIZE - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            log::debug!("Truncated body of {} at {} bytes", url, MAX_RESPONSE_BODY_SIZE);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    let content = String::from_utf8_lossy(&body).into_owned();

    let next = match location {
        Some(location) if is_market_url(&location) => Some(HopRecord::new(
            prepare_url(&fix_market_url(&location)),
            HopKind::MarketHttp,
        )),
        Some(location) => Some(HopRecord::new(
            prepare_url(&join_url(url, &location)),
            HopKind::Http,
        )),
        None => extract_meta_redirect(&content, url).map(|target| {
            let target = if is_market_url(&target) {
                fix_market_url(&target)
            } else {
                target
            };
            HopRecord::new(prepare_url(&target), HopKind::Meta)
        }),
    };

    Ok(Resolution { next, content })
}
