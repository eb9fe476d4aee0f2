//! Redirect history walking.
//!
//! Drives repeated single-hop resolutions into an ordered, loop-safe and
//! error-safe hop history.

use crate::models::{HopKind, RedirectHistory, WalkStop};
use crate::resolve::{detect_counters, is_terminal_domain, prepare_url, Resolver};

/// Limits applied to one walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum number of hops recorded; reaching it stops the walk
    pub max_redirects: usize,
    /// Request URLs on these domains are returned without fetching
    pub terminal_domains: Vec<String>,
}

impl WalkOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_redirects: config.max_redirects,
            terminal_domains: config.terminal_domains.clone(),
        }
    }
}

/// Follows the redirect chain starting at `url`.
///
/// The chain stops on the first of:
/// - a page with no further hop (`Done`, the only state with counters)
/// - a failed fetch, recorded as a final `ERROR` hop pointing at the URL that failed
/// - a hop back to a URL already in the chain
/// - `max_redirects` recorded hops (with a budget of 0 nothing is fetched)
///
/// A request URL on a terminal domain yields a single-element history.
pub async fn get_redirect_history<R>(resolver: &R, url: &str, options: &WalkOptions) -> RedirectHistory
where
    R: Resolver + ?Sized,
{
    let mut current = prepare_url(url);
    let mut urls = vec![current.clone()];
    let mut types = Vec::new();

    if is_terminal_domain(&current, &options.terminal_domains) {
        log::debug!("{} is on a terminal domain, not following", current);
        return RedirectHistory {
            urls,
            types,
            counters: None,
            stop: WalkStop::TerminalDomain,
        };
    }

    if options.max_redirects == 0 {
        return RedirectHistory {
            urls,
            types,
            counters: None,
            stop: WalkStop::DepthStop,
        };
    }

    let stop = loop {
        let resolution = match resolver.resolve(&current).await {
            Ok(resolution) => resolution,
            Err(e) => {
                log::warn!("Hop failed: {}", e);
                urls.push(current);
                types.push(HopKind::Error);
                break WalkStop::ErrorStop;
            }
        };

        let Some(hop) = resolution.next else {
            let counters = detect_counters(&resolution.content);
            log::debug!(
                "Walk of {} done after {} hops, {} counters",
                url,
                types.len(),
                counters.len()
            );
            return RedirectHistory {
                urls,
                types,
                counters: Some(counters),
                stop: WalkStop::Done,
            };
        };

        let seen = urls.contains(&hop.url);
        urls.push(hop.url.clone());
        types.push(hop.kind);

        if hop.kind == HopKind::Error {
            break WalkStop::ErrorStop;
        }
        if seen {
            break WalkStop::LoopStop;
        }
        if types.len() >= options.max_redirects {
            break WalkStop::DepthStop;
        }
        current = hop.url;
    };

    log::debug!("Walk of {} stopped ({}) after {} hops", url, stop, types.len());
    RedirectHistory {
        urls,
        types,
        counters: None,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::RequestError;
    use crate::models::{HopRecord, Resolution};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Resolver answering from a fixed url -> outcome table.
    struct ScriptedResolver {
        hops: HashMap<String, Option<HopRecord>>,
        content: HashMap<String, String>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedResolver {
        fn new() -> Self {
            Self {
                hops: HashMap::new(),
                content: HashMap::new(),
                failing: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn hop(mut self, from: &str, to: &str, kind: HopKind) -> Self {
            self.hops
                .insert(from.to_string(), Some(HopRecord::new(to, kind)));
            self
        }

        fn page(mut self, url: &str, content: &str) -> Self {
            self.hops.insert(url.to_string(), None);
            self.content.insert(url.to_string(), content.to_string());
            self
        }

        fn fail(mut self, url: &str) -> Self {
            self.failing.push(url.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        async fn resolve(&self, url: &str) -> Result<Resolution, RequestError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.failing.iter().any(|u| u == url) {
                return Err(RequestError::Timeout {
                    url: url.to_string(),
                });
            }
            Ok(Resolution {
                next: self.hops.get(url).cloned().flatten(),
                content: self.content.get(url).cloned().unwrap_or_default(),
            })
        }
    }

    fn options(max_redirects: usize) -> WalkOptions {
        WalkOptions {
            max_redirects,
            terminal_domains: vec!["ok.ru".to_string()],
        }
    }

    const URL1: &str = "http://url1.example/";
    const URL2: &str = "http://url2.example/";
    const URL3: &str = "http://url3.example/";

    #[tokio::test]
    async fn test_meta_chain_to_terminal_page() {
        let resolver = ScriptedResolver::new()
            .hop(URL1, URL2, HopKind::Meta)
            .hop(URL2, URL3, HopKind::Meta)
            .page(URL3, r#"<script src="//mc.yandex.ru/metrika/watch.js"></script>"#);

        let history = get_redirect_history(&resolver, URL1, &options(30)).await;
        assert_eq!(history.types, vec![HopKind::Meta, HopKind::Meta]);
        assert_eq!(history.urls, vec![URL1, URL2, URL3]);
        assert_eq!(history.stop, WalkStop::Done);
        let counters = history.counters.expect("counters on a terminal page");
        assert_eq!(counters.get("YA_METRICA"), Some(&true));
        assert_eq!(counters.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_fetches_nothing() {
        let resolver = ScriptedResolver::new().hop(URL1, URL2, HopKind::Http);

        let history = get_redirect_history(&resolver, URL1, &options(0)).await;
        assert_eq!(history.urls, vec![URL1]);
        assert!(history.types.is_empty());
        assert_eq!(history.stop, WalkStop::DepthStop);
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_error_stops_walk() {
        let resolver = ScriptedResolver::new()
            .hop(URL1, URL2, HopKind::Http)
            .fail(URL2)
            .page(URL3, "never fetched");

        let history = get_redirect_history(&resolver, URL1, &options(30)).await;
        assert_eq!(history.types, vec![HopKind::Http, HopKind::Error]);
        assert_eq!(history.urls, vec![URL1, URL2, URL2]);
        assert_eq!(history.urls.len(), history.types.len() + 1);
        assert_eq!(history.stop, WalkStop::ErrorStop);
        assert!(history.counters.is_none());
        assert!(history.is_error());
        assert_eq!(resolver.calls(), vec![URL1, URL2]);
    }

    #[tokio::test]
    async fn test_error_hop_from_resolver_stops_walk() {
        let resolver = ScriptedResolver::new()
            .hop(URL1, URL2, HopKind::Error)
            .page(URL2, "never fetched");

        let history = get_redirect_history(&resolver, URL1, &options(30)).await;
        assert_eq!(history.types, vec![HopKind::Error]);
        assert_eq!(history.urls, vec![URL1, URL2]);
        assert_eq!(resolver.calls(), vec![URL1]);
    }

    #[tokio::test]
    async fn test_loop_is_detected() {
        let resolver = ScriptedResolver::new()
            .hop(URL1, URL2, HopKind::Http)
            .hop(URL2, URL1, HopKind::Meta);

        let history = get_redirect_history(&resolver, URL1, &options(30)).await;
        assert_eq!(history.urls, vec![URL1, URL2, URL1]);
        assert_eq!(history.types, vec![HopKind::Http, HopKind::Meta]);
        assert_eq!(history.stop, WalkStop::LoopStop);
        assert!(history.counters.is_none());
        assert_eq!(resolver.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_self_redirect_is_a_loop() {
        let resolver = ScriptedResolver::new().hop(URL1, URL1, HopKind::Http);

        let history = get_redirect_history(&resolver, URL1, &options(30)).await;
        assert_eq!(history.urls, vec![URL1, URL1]);
        assert_eq!(history.stop, WalkStop::LoopStop);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let resolver = ScriptedResolver::new()
            .hop(URL1, URL2, HopKind::Http)
            .hop(URL2, URL3, HopKind::Http)
            .page(URL3, "google-analytics.com/ga.js");

        let history = get_redirect_history(&resolver, URL1, &options(2)).await;
        assert_eq!(history.types.len(), 2);
        assert_eq!(history.urls, vec![URL1, URL2, URL3]);
        assert_eq!(history.stop, WalkStop::DepthStop);
        assert!(history.counters.is_none());
        assert_eq!(resolver.calls(), vec![URL1, URL2]);
    }

    #[tokio::test]
    async fn test_terminal_domain_short_circuits() {
        let resolver = ScriptedResolver::new().hop(
            "http://www.ok.ru/",
            URL2,
            HopKind::Http,
        );

        let history = get_redirect_history(&resolver, "http://www.ok.ru/", &options(30)).await;
        assert_eq!(history.urls, vec!["http://www.ok.ru/"]);
        assert!(history.types.is_empty());
        assert!(history.counters.is_none());
        assert_eq!(history.stop, WalkStop::TerminalDomain);
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_url_is_prepared() {
        let resolver = ScriptedResolver::new().page("http://xn--e1afmkfd.xn--p1ai/", "");

        let history = get_redirect_history(&resolver, "http://пример.рф", &options(30)).await;
        assert_eq!(history.urls, vec!["http://xn--e1afmkfd.xn--p1ai/"]);
        assert_eq!(history.stop, WalkStop::Done);
        assert_eq!(history.counters, Some(Default::default()));
    }
}
