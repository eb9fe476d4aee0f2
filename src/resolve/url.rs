//! URL preparation and matching.

use log::debug;
use url::Url;

/// Normalizes a URL before it is fetched or recorded.
///
/// Parsing with the `url` crate converts internationalized host names to
/// their ASCII (punycode) form and canonicalizes the rest of the URL. When the
/// URL cannot be parsed or its host cannot be encoded, the raw string is
/// returned unchanged.
pub fn prepare_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(e) => {
            debug!("Keeping unnormalized URL {raw}: {e}");
            raw.to_string()
        }
    }
}

/// Resolves a redirect target against the URL of the page that announced it.
///
/// Absolute targets are returned verbatim; relative targets are joined onto
/// `base`. When neither works the target is returned as given.
pub fn join_url(base: &str, target: &str) -> String {
    if Url::parse(target).is_ok() {
        return target.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(target))
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| target.to_string())
}

/// Returns true when the host of `url` equals one of `domains` or is a
/// subdomain of one.
///
/// Matching is on DNS labels: `ok.ru` matches `ok.ru` and `www.ok.ru` but not
/// `book.ru`. Entries are compared case-insensitively; a leading `.` or a
/// trailing `.` on either side is ignored.
pub fn is_terminal_domain(url: &str, domains: &[String]) -> bool {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
    else {
        return false;
    };

    domains.iter().any(|domain| {
        let domain = domain
            .trim()
            .trim_start_matches('.')
            .trim_end_matches('.')
            .to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.')))
    })
}
