//! Meta-refresh redirect extraction.
//!
//! Recognizes `<meta http-equiv="refresh" content="<delay>;URL=<target>">`
//! where the target may be wrapped in single or double quotes. Anything that
//! deviates from that shape is treated as "no redirect".

use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::url::join_url;

const META_REFRESH_SELECTOR_STR: &str = "meta[http-equiv]";

static META_REFRESH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(META_REFRESH_SELECTOR_STR).unwrap_or_else(|e| {
        panic!(
            "Failed to parse CSS selector '{}': {}. This is a programming error.",
            META_REFRESH_SELECTOR_STR, e
        )
    })
});

/// Extracts the redirect target of the first meta-refresh tag in `html`.
///
/// Absolute targets are returned exactly as written. Relative targets are
/// joined onto `base_url` (pass `""` to get them back unchanged).
///
/// Returns `None` when there is no refresh tag or when its `content` is
/// malformed: trailing text after the target, a misspelled `URL` keyword, a
/// non-numeric delay or an unbalanced quote.
pub fn extract_meta_redirect(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let content = document
        .select(&META_REFRESH_SELECTOR)
        .find(|meta| {
            meta.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })?
        .value()
        .attr("content")?;

    let target = parse_refresh_content(content)?;
    log::debug!("Found meta refresh target '{}'", target);
    Some(join_url(base_url, target))
}

/// Splits `<delay>;URL=<target>` and returns the target.
///
/// A quoted target may contain `;`; an unquoted one may not.
fn parse_refresh_content(content: &str) -> Option<&str> {
    let (delay, directive) = content.split_once(';')?;
    let (delay, directive) = (delay.trim(), directive.trim());

    if delay.is_empty() || !delay.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let keyword = directive.get(..3)?;
    if !keyword.eq_ignore_ascii_case("url") {
        return None;
    }
    let value = directive[3..].trim_start().strip_prefix('=')?.trim();

    let target = match value.chars().next()? {
        quote @ ('\'' | '"') => {
            let inner = &value[1..];
            let end = inner.find(quote)?;
            // The closing quote must end the attribute
            if end + 1 != inner.len() {
                return None;
            }
            &inner[..end]
        }
        _ => {
            if value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | ';'))
            {
                return None;
            }
            value
        }
    };

    (!target.is_empty()).then_some(target)
}
