//! Tracking counter detection.
//!
//! A fixed registry of analytics / ad-network signatures matched against the
//! raw landing page content. Detection is purely textual: scripts are not
//! executed, so counters injected at runtime are not seen.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Counters;

/// A named tracking signature.
pub struct CounterSignature {
    pub name: &'static str,
    pub pattern: Regex,
}

/// Helper function to compile a static regex pattern, panicking with a detailed
/// error message if compilation fails.
fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}

const SIGNATURES: &[(&str, &str)] = &[
    (
        "GOOGLE_ANALYTICS",
        r"(?i)google-analytics\.com/(?:ga|analytics)\.js|googletagmanager\.com/gtag/js",
    ),
    ("YA_METRICA", r"(?i)mc\.yandex\.ru/(?:metrika/(?:watch|tag)\.js|watch/)"),
    ("TOP_MAIL_RU", r"(?i)top-fwz1\.mail\.ru/(?:counter|js/code\.js)"),
    ("TOP_MAIL_RU_JUMP", r"(?i)top\.mail\.ru/jump\?from"),
    ("DOUBLECLICK", r"(?i)\.doubleclick\.net/"),
    ("VK_RETARGETING", r"(?i)vk\.com/rtrg"),
    ("LI_RU", r"(?i)counter\.yadro\.ru/hit"),
    ("RAMBLER_TOP100", r"(?i)counter\.rambler\.ru/top100"),
    ("FACEBOOK_PIXEL", r"(?i)connect\.facebook\.net/[a-z_]+/fbevents\.js"),
];

/// The signature registry, in fixed order. Names are unique.
pub static COUNTER_SIGNATURES: LazyLock<Vec<CounterSignature>> = LazyLock::new(|| {
    SIGNATURES
        .iter()
        .map(|&(name, pattern)| CounterSignature {
            name,
            pattern: compile_regex_unsafe(pattern, name),
        })
        .collect()
});

/// Scans `content` against every registered signature.
///
/// The result holds one `true` entry per signature that matched at least
/// once; signatures that did not match are absent.
pub fn detect_counters(content: &str) -> Counters {
    COUNTER_SIGNATURES
        .iter()
        .filter(|signature| signature.pattern.is_match(content))
        .map(|signature| (signature.name.to_string(), true))
        .collect()
}
