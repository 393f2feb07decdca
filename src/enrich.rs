//! Description fallback for thin feed summaries.
//!
//! Some publishers ship empty or clipped `<description>` elements. For an
//! allow-listed set of domains, the article page itself is fetched and a
//! description is pulled out of it, in order of preference:
//!
//! 1. JSON-LD `description` (top level, arrays, or `@graph`)
//! 2. `<meta name="description">`
//! 3. `<meta property="og:description">`
//! 4. the first few long `<p>` paragraphs
//!
//! The fetch is bounded by a short timeout. Any failure means "no
//! description" and the feed summary is used as-is.

use crate::config::PipelineConfig;
use crate::models::host_of;
use crate::normalize::{collapse_whitespace, strip_html, TextNormalizer};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

const MIN_PARAGRAPH_CHARS: usize = 80;
const MAX_PARAGRAPHS: usize = 3;

#[derive(Debug, Clone)]
pub struct PageEnricher {
    client: Client,
    timeout: Duration,
    domains: Vec<String>,
    min_chars: usize,
    enabled: bool,
}

impl PageEnricher {
    pub fn new(config: &PipelineConfig, client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.enrich_timeout_secs),
            domains: config.enrich_domains.iter().map(|d| d.to_lowercase()).collect(),
            min_chars: config.enrich_min_chars,
            enabled: config.enrich_summaries,
        }
    }

    fn is_allowed(&self, url: &str) -> bool {
        host_of(url).is_some_and(|host| {
            self.domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        })
    }

    /// Whether a feed summary is thin enough to go look at the page.
    pub fn should_enrich(&self, summary: &str, url: &str) -> bool {
        if !self.enabled || !self.is_allowed(url) {
            return false;
        }
        let summary = summary.trim();
        summary.is_empty()
            || summary.chars().count() < self.min_chars
            || summary.ends_with('…')
            || summary.ends_with("...")
    }

    /// Fetch the page and extract a description. Never fails.
    #[instrument(level = "debug", skip(self, normalizer))]
    pub async fn describe(&self, url: &str, normalizer: &TextNormalizer) -> Option<String> {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Page fetch failed");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Page fetch returned an error status");
                return None;
            }
        };
        match response.text().await {
            Ok(html) => extract_description(&html, normalizer),
            Err(e) => {
                debug!(error = %e, "Page body unreadable");
                None
            }
        }
    }
}

fn accept(candidate: &str, normalizer: &TextNormalizer) -> Option<String> {
    let text = strip_html(candidate);
    if text.is_empty() || normalizer.is_promotional(&text) {
        None
    } else {
        Some(text)
    }
}

fn json_ld_description(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(json_ld_description),
        serde_json::Value::Object(map) => map
            .get("description")
            .and_then(|d| d.as_str())
            .filter(|d| !d.trim().is_empty())
            .or_else(|| map.get("@graph").and_then(json_ld_description)),
        _ => None,
    }
}

/// Pull a description out of an article page.
pub fn extract_description(html: &str, normalizer: &TextNormalizer) -> Option<String> {
    let document = Html::parse_document(html);

    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        if let Some(found) = json_ld_description(&json).and_then(|d| accept(d, normalizer)) {
            return Some(found);
        }
    }

    for selector in [&*META_DESCRIPTION, &*OG_DESCRIPTION] {
        let found = document
            .select(selector)
            .filter_map(|m| m.value().attr("content"))
            .find_map(|content| accept(content, normalizer));
        if found.is_some() {
            return found;
        }
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .filter(|p| !normalizer.is_promotional(p))
        .take(MAX_PARAGRAPHS)
        .collect();
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::rss::build_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&PipelineConfig::default())
    }

    fn enricher(domains: Vec<String>) -> PageEnricher {
        let config = PipelineConfig {
            enrich_domains: domains,
            ..PipelineConfig::default()
        };
        let client = build_client("HornUpdatesTest/1.0", Duration::from_secs(2)).unwrap();
        PageEnricher::new(&config, client)
    }

    #[test]
    fn test_json_ld_preferred_over_meta() {
        let html = r#"<html><head>
            <meta name="description" content="Meta description of the story.">
            <script type="application/ld+json">{"@graph":[{"@type":"WebPage"},{"@type":"NewsArticle","description":"JSON-LD description &amp; more."}]}</script>
        </head><body></body></html>"#;
        assert_eq!(
            extract_description(html, &normalizer()).as_deref(),
            Some("JSON-LD description & more.")
        );
    }

    #[test]
    fn test_meta_then_og_fallbacks() {
        let html = r#"<html><head>
            <meta name="description" content="Subscribe to our print edition">
            <meta property="og:description" content="Open graph description.">
        </head></html>"#;
        assert_eq!(
            extract_description(html, &normalizer()).as_deref(),
            Some("Open graph description.")
        );
    }

    #[test]
    fn test_paragraph_fallback_skips_short_and_promo() {
        let long = "Ethiopian and Eritrean officials met in Asmara on Tuesday to review the border agreement.";
        let html = format!(
            "<html><body><p>Short.</p><p>{long}</p><p>Please subscribe to keep reading this and many more of our articles.</p></body></html>"
        );
        assert_eq!(extract_description(&html, &normalizer()).as_deref(), Some(long));
        assert_eq!(extract_description("<html><body><p>tiny</p></body></html>", &normalizer()), None);
    }

    #[test]
    fn test_should_enrich_rules() {
        let e = enricher(vec!["hiiraan.com".to_string()]);
        let url = "https://www.hiiraan.com/news/a.html";
        assert!(e.should_enrich("", url));
        assert!(e.should_enrich("A clipped summary…", url));
        assert!(e.should_enrich("Short.", url));
        assert!(!e.should_enrich(&"Long enough summary. ".repeat(10), url));
        assert!(!e.should_enrich("", "https://example.com/a"));
        assert!(!e.should_enrich("", "https://nothiiraan.com/a"));
        assert!(e.should_enrich("", "https://hiiraan.com/a"));
    }

    #[tokio::test]
    async fn test_describe_fetches_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta name="description" content="Fetched description."></head></html>"#,
            ))
            .mount(&server)
            .await;

        let e = enricher(vec!["127.0.0.1".to_string()]);
        let url = format!("{}/story", server.uri());
        assert!(e.should_enrich("", &url));
        assert_eq!(
            e.describe(&url, &normalizer()).await.as_deref(),
            Some("Fetched description.")
        );
    }

    #[tokio::test]
    async fn test_describe_swallows_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let e = enricher(vec!["127.0.0.1".to_string()]);
        assert_eq!(e.describe(&format!("{}/missing", server.uri()), &normalizer()).await, None);
        assert_eq!(e.describe("http://127.0.0.1:9/none", &normalizer()).await, None);
    }
}
