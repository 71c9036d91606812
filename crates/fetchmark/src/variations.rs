//! URL variation generation
//!
//! One input URL becomes an ordered fallback chain: the original first, then
//! progressively more speculative rewrites. The orchestrator tries them in
//! order and stops at the first success, so callers never hand-roll fallback
//! URLs themselves.

use crate::dns::HostAliasSource;
use crate::normalize::normalize_url;
use url::Url;

/// Generate the candidate URL list without DNS enrichment
///
/// The result is never empty, starts with the original URL, and contains no
/// duplicates. Guaranteed candidates: original, normalized form, forced
/// https, forced http, and a `www.`-stripped variant, followed by hosts from
/// the subdomain-removal heuristic.
pub async fn generate_url_variations(url: &str) -> Vec<String> {
    build_variations(url, None).await
}

/// Generate the candidate URL list, enriched with aliases from the source
///
/// Alias lookups only ever add candidates; a source returning nothing leaves
/// the guaranteed base set intact.
pub async fn generate_url_variations_with_aliases(
    url: &str,
    aliases: &dyn HostAliasSource,
) -> Vec<String> {
    build_variations(url, Some(aliases)).await
}

async fn build_variations(url: &str, aliases: Option<&dyn HostAliasSource>) -> Vec<String> {
    let mut variations = vec![url.to_string(), normalize_url(url)];

    if let Ok(parsed) = Url::parse(url) {
        if let Some(forced) = with_scheme(&parsed, "https") {
            variations.push(forced);
        }
        if let Some(forced) = with_scheme(&parsed, "http") {
            variations.push(forced);
        }

        if let Some(host) = parsed.host_str().map(str::to_string) {
            if let Some(stripped) = host.strip_prefix("www.") {
                if let Some(alt) = with_host(&parsed, stripped) {
                    variations.push(alt);
                }
            }

            let mut alt_hosts = Vec::new();
            if let Some(source) = aliases {
                alt_hosts.extend(source.aliases(&host).await);
            }
            alt_hosts.extend(subdomain_candidates(&host));

            for alt_host in alt_hosts {
                if let Some(alt) = with_host(&parsed, &alt_host) {
                    variations.push(alt);
                }
            }
        }
    }

    dedup_preserving_order(variations)
}

/// Rewrite the URL with a different scheme, if the rewrite is representable
fn with_scheme(url: &Url, scheme: &str) -> Option<String> {
    let mut alt = url.clone();
    alt.set_scheme(scheme).ok()?;
    Some(alt.to_string())
}

/// Rewrite the URL with a different host, if the host is valid
fn with_host(url: &Url, host: &str) -> Option<String> {
    let mut alt = url.clone();
    alt.set_host(Some(host)).ok()?;
    Some(alt.to_string())
}

/// Subdomain-removal heuristic
///
/// Hosts with more than two dot-separated labels also get the host with the
/// leftmost label removed, and that result prefixed with `www.`.
fn subdomain_candidates(host: &str) -> Vec<String> {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return Vec::new();
    }
    let parent = labels[1..].join(".");
    vec![parent.clone(), format!("www.{parent}")]
}

fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(urls.len());
    for url in urls {
        if !unique.contains(&url) {
            unique.push(url);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedAliases(Vec<String>);

    #[async_trait]
    impl HostAliasSource for FixedAliases {
        async fn aliases(&self, _host: &str) -> Vec<String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_first_entry_is_original_and_no_duplicates() {
        let variations = generate_url_variations("https://www.example.com/page/").await;
        assert!(!variations.is_empty());
        assert_eq!(variations[0], "https://www.example.com/page/");

        let mut seen = variations.clone();
        seen.dedup();
        assert_eq!(seen.len(), variations.len());
    }

    #[tokio::test]
    async fn test_base_set_contains_scheme_and_www_variants() {
        let variations = generate_url_variations("https://www.example.com/page").await;
        assert!(variations.contains(&"http://www.example.com/page".to_string()));
        assert!(variations.contains(&"https://example.com/page".to_string()));
    }

    #[tokio::test]
    async fn test_subdomain_heuristic() {
        let variations = generate_url_variations("https://docs.service.io/guide").await;
        assert!(variations.contains(&"https://service.io/guide".to_string()));
        assert!(variations.contains(&"https://www.service.io/guide".to_string()));
    }

    #[tokio::test]
    async fn test_two_label_host_has_no_heuristic_candidates() {
        assert!(subdomain_candidates("example.com").is_empty());
        assert_eq!(
            subdomain_candidates("a.b.example.com"),
            vec!["b.example.com".to_string(), "www.b.example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_alias_source_appends_candidates() {
        let source = FixedAliases(vec!["cdn.example.net".to_string()]);
        let variations =
            generate_url_variations_with_aliases("https://example.com/x", &source).await;
        assert!(variations.contains(&"https://cdn.example.net/x".to_string()));
        // Base set is unaffected by the source
        assert_eq!(variations[0], "https://example.com/x");
    }

    #[tokio::test]
    async fn test_empty_alias_source_leaves_base_set() {
        let source = FixedAliases(Vec::new());
        let with = generate_url_variations_with_aliases("https://example.com/x", &source).await;
        let without = generate_url_variations("https://example.com/x").await;
        assert_eq!(with, without);
    }

    #[tokio::test]
    async fn test_unparseable_url_still_yields_candidates() {
        let variations = generate_url_variations("not a url").await;
        assert_eq!(variations, vec!["not a url".to_string()]);
    }
}
