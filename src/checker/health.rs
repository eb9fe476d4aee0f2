//! Network health probing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Decides whether the network is usable before workers are topped up.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn is_up(&self) -> bool;
}

/// Probe fetching a fixed URL; any error or non-success status means down.
pub struct HttpHealthProbe {
    client: Arc<reqwest::Client>,
    url: String,
    timeout: Duration,
}

impl HttpHealthProbe {
    pub fn new(client: Arc<reqwest::Client>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_up(&self) -> bool {
        let result = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match result {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Health probe of {} failed: {}", self.url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};

    fn probe(url: String, timeout: Duration) -> HttpHealthProbe {
        HttpHealthProbe::new(Arc::new(reqwest::Client::new()), url, timeout)
    }

    #[tokio::test]
    async fn test_probe_up() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/"))
                .respond_with(status_code(200)),
        );
        assert!(probe(server.url("/").to_string(), Duration::from_secs(2)).is_up().await);
    }

    #[tokio::test]
    async fn test_probe_error_status_is_down() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/"))
                .respond_with(status_code(503)),
        );
        assert!(!probe(server.url("/").to_string(), Duration::from_secs(2)).is_up().await);
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_down() {
        assert!(
            !probe("http://127.0.0.1:9/".to_string(), Duration::from_secs(2))
                .is_up()
                .await
        );
    }

    #[tokio::test]
    async fn test_probe_timeout_is_down() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/"))
                .respond_with(delay_and_then(Duration::from_secs(2), status_code(200))),
        );
        assert!(
            !probe(server.url("/").to_string(), Duration::from_millis(200))
                .is_up()
                .await
        );
    }
}
