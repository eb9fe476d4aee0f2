//! Error categorization and retry strategy.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::RequestErrorKind;

/// Creates an exponential backoff retry strategy.
///
/// Used when establishing queue connections at process start. Configured with
/// `RETRY_INITIAL_DELAY_MS`, `RETRY_FACTOR`, `RETRY_MAX_DELAY_SECS` and limited
/// to `RETRY_MAX_ATTEMPTS` attempts.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS)
}

/// Categorizes a `reqwest::Error` into a `RequestErrorKind`.
///
/// Timeouts are checked before connect errors: a connect timeout counts as a
/// timeout.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> RequestErrorKind {
    if error.is_builder() {
        RequestErrorKind::Builder
    } else if error.is_redirect() {
        RequestErrorKind::Redirect
    } else if error.is_status() {
        RequestErrorKind::Status
    } else if error.is_timeout() {
        RequestErrorKind::Timeout
    } else if error.is_connect() {
        RequestErrorKind::Connect
    } else if error.is_request() {
        RequestErrorKind::Request
    } else if error.is_body() {
        RequestErrorKind::Body
    } else if error.is_decode() {
        RequestErrorKind::Decode
    } else {
        RequestErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_retry_strategy_initial_delay() {
        let first_delay = get_retry_strategy()
            .next()
            .expect("strategy yields at least one delay");
        let expected_ms = crate::config::RETRY_INITIAL_DELAY_MS as u128;
        assert!(
            first_delay.as_millis() >= expected_ms,
            "Expected delay >= {}ms, got {}ms",
            expected_ms,
            first_delay.as_millis()
        );
    }

    #[test]
    fn test_get_retry_strategy_max_delay() {
        let max_delay_ms = crate::config::RETRY_MAX_DELAY_SECS * 1000;
        for delay in get_retry_strategy() {
            assert!(
                delay.as_millis() <= max_delay_ms as u128,
                "Delay {}ms exceeds max {}ms",
                delay.as_millis(),
                max_delay_ms
            );
        }
    }

    #[test]
    fn test_get_retry_strategy_max_attempts() {
        assert_eq!(
            get_retry_strategy().count(),
            crate::config::RETRY_MAX_ATTEMPTS
        );
    }

    #[tokio::test]
    async fn test_categorize_connect_refused() {
        // Port 9 (discard) on localhost is closed in test environments
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("nothing listens on port 9");
        assert_eq!(categorize_reqwest_error(&err), RequestErrorKind::Connect);
    }

    #[tokio::test]
    async fn test_categorize_builder_error() {
        let client = reqwest::Client::new();
        let err = client
            .get("not a url")
            .send()
            .await
            .expect_err("relative URL cannot be sent");
        assert_eq!(categorize_reqwest_error(&err), RequestErrorKind::Builder);
    }
}
