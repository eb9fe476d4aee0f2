//! App-store deep link normalization.
//!
//! `market://details?id=com.example` style links cannot be fetched; they are
//! rewritten onto the store's web front so the chain can continue.

use crate::config::MARKET_BASE_URL;

const MARKET_SCHEME_PREFIX: &str = "market://";

/// Returns true when `raw` carries the market scheme (case-insensitive).
pub fn is_market_url(raw: &str) -> bool {
    strip_market_scheme(raw).is_some()
}

fn strip_market_scheme(raw: &str) -> Option<&str> {
    let prefix = raw.get(..MARKET_SCHEME_PREFIX.len())?;
    prefix
        .eq_ignore_ascii_case(MARKET_SCHEME_PREFIX)
        .then(|| &raw[MARKET_SCHEME_PREFIX.len()..])
}

/// Rewrites an app-store deep link into a fetchable HTTP URL.
///
/// The scheme is stripped and the remainder (host + path) appended verbatim to
/// the store base. Input without the market scheme is appended whole.
///
/// ```
/// use redirect_checker::fix_market_url;
///
/// assert_eq!(
///     fix_market_url("market://test/app"),
///     "http://play.google.com/store/apps/test/app"
/// );
/// assert_eq!(fix_market_url("path"), "http://play.google.com/store/apps/path");
/// ```
pub fn fix_market_url(raw: &str) -> String {
    let suffix = strip_market_scheme(raw).unwrap_or(raw);
    format!("{MARKET_BASE_URL}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_market_url_with_scheme() {
        assert_eq!(
            fix_market_url("market://test/app"),
            "http://play.google.com/store/apps/test/app"
        );
    }

    #[test]
    fn test_fix_market_url_without_scheme() {
        assert_eq!(
            fix_market_url("path"),
            "http://play.google.com/store/apps/path"
        );
    }

    #[test]
    fn test_fix_market_url_keeps_query_verbatim() {
        assert_eq!(
            fix_market_url("market://details?id=com.example.app&referrer=utm_source%3Dad"),
            "http://play.google.com/store/apps/details?id=com.example.app&referrer=utm_source%3Dad"
        );
    }

    #[test]
    fn test_is_market_url_case_insensitive() {
        assert!(is_market_url("MARKET://details?id=x"));
        assert!(is_market_url("market://details?id=x"));
        assert!(!is_market_url("http://market.example/"));
        assert!(!is_market_url("mark"));
        // Multi-byte input shorter than the prefix must not panic
        assert!(!is_market_url("мар"));
    }
}
