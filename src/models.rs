//! Data models for raw feed entries, published articles, and the corpus file.
//!
//! - [`RawEntry`]: one candidate item as produced by a [`crate::sources::Source`]
//! - [`Article`]: the normalized, tagged unit of record
//! - [`CorpusDocument`]: the `articles.json` payload (`generated_at` + `articles`)
//!
//! The corpus file may also be in the legacy shape where the top-level value is
//! the bare article array; [`CorpusDocument::from_json_value`] accepts both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;

/// A raw candidate item from a source, before any cleaning.
///
/// `text_fields` holds every textual variant the source offered, in the order
/// rich content, summary detail, summary, description, subtitle.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub text_fields: Vec<String>,
    /// Country tags supplied by the source itself, authoritative when present.
    pub country_tags: Vec<String>,
}

impl RawEntry {
    /// The publish time, falling back to the update time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.updated)
    }
}

/// A normalized, tagged news article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub country_tags: Vec<String>,
    /// Tags that came with the entry from its source. Only these survive
    /// re-tagging; everything in `country_tags` beyond them is re-inferred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplied_country_tags: Vec<String>,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source_url: String,
    /// Alias of `source_url` kept for downstream automations.
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "en".to_string()
}

impl Article {
    /// Identity key used for deduplication.
    ///
    /// The canonical source URL, or `title|published_at` when the URL is absent.
    pub fn identity_key(&self) -> String {
        let url = if self.source_url.is_empty() {
            &self.link
        } else {
            &self.source_url
        };
        if url.trim().is_empty() {
            format!("{}|{}", self.title.trim(), self.published_at.to_rfc3339())
        } else {
            canonical_url(url)
        }
    }
}

/// The persisted `articles.json` document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusDocument {
    pub generated_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl CorpusDocument {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            generated_at: Utc::now(),
            articles,
        }
    }

    /// Read either the object shape or the legacy bare-array shape.
    ///
    /// Individual entries that fail to deserialize (no parseable
    /// `published_at`, missing title) are dropped, as are entries without a
    /// title or link, so the strict admission rule holds for any input file.
    pub fn from_json_value(value: serde_json::Value) -> Self {
        let (generated_at, raw_articles) = match value {
            serde_json::Value::Array(items) => (None, items),
            serde_json::Value::Object(mut map) => {
                let generated_at = map
                    .get("generated_at")
                    .and_then(|v| v.as_str())
                    .and_then(parse_timestamp);
                let items = match map.remove("articles") {
                    Some(serde_json::Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                (generated_at, items)
            }
            _ => (None, Vec::new()),
        };

        let total = raw_articles.len();
        let articles: Vec<Article> = raw_articles
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Article>(v).ok())
            .map(|mut a| {
                if a.source_url.is_empty() {
                    a.source_url = a.link.clone();
                }
                a
            })
            .filter(|a| !a.title.trim().is_empty() && !a.source_url.trim().is_empty())
            .collect();
        if articles.len() != total {
            debug!(total, kept = articles.len(), "Dropped invalid corpus entries on load");
        }

        Self {
            generated_at: generated_at.unwrap_or_else(Utc::now),
            articles,
        }
    }
}

/// Parse an ISO-8601 timestamp; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let normalized = raw.replace(' ', "T");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Canonical form of a story URL.
///
/// Trims, drops the fragment and `utm_*` tracking parameters, lower-cases the
/// host (the `url` crate does that for us). Unparseable input is returned
/// trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !k.to_lowercase().starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}

/// Stable short identifier: the first 12 hex chars of the SHA-1 of the
/// canonical URL. Ids already published in `articles.json` use this form.
pub fn article_id(source_url: &str) -> String {
    let digest = Sha1::digest(canonical_url(source_url).as_bytes());
    hex::encode(digest)[..12].to_string()
}

pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
