//! Immutable pipeline configuration.
//!
//! Everything that used to be a module-level table (feed list, keyword lists,
//! blocked and always-include sources, country rules) lives in
//! [`PipelineConfig`]. The default value is the Horn of Africa configuration;
//! a YAML file can override any subset of fields.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "HornUpdatesBot/1.0 (+https://hornupdates.com)";

/// One ordered country rule: a display name and the names that identify it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountryRule {
    pub country: String,
    pub names: Vec<String>,
}

/// A non-exclusive topic bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicBucket {
    pub topic: String,
    pub keywords: Vec<String>,
}

/// Fallback country for a publisher domain when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainCountry {
    pub domain: String,
    pub country: String,
}

/// Full configuration for one ingestion run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub user_agent: String,
    pub feeds: Vec<String>,
    /// Feed URL fragments whose entries skip the topical relevance check.
    pub always_include_feeds: Vec<String>,
    /// Host fragments whose entries are never admitted.
    pub blocked_sources: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub country_rules: Vec<CountryRule>,
    pub domain_countries: Vec<DomainCountry>,
    pub topic_buckets: Vec<TopicBucket>,
    pub default_topic: String,
    pub max_country_tags: usize,

    pub promo_phrases: Vec<String>,
    pub min_summary_chars: usize,
    pub max_summary_chars: usize,
    pub max_summary_sentences: usize,

    /// Domains whose article pages may be fetched to recover a description.
    pub enrich_domains: Vec<String>,
    pub enrich_summaries: bool,
    pub enrich_min_chars: usize,
    pub enrich_timeout_secs: u64,

    pub feed_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub max_articles: usize,
    pub future_skew_minutes: i64,
    pub bootstrap_window_hours: i64,

    pub advance_watermark_on_empty: bool,
    pub renormalize_on_merge: bool,
    pub keep_corpus_on_empty: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn country(country: &str, names: &[&str]) -> CountryRule {
    CountryRule {
        country: country.to_string(),
        names: strings(names),
    }
}

fn domain(domain: &str, country: &str) -> DomainCountry {
    DomainCountry {
        domain: domain.to_string(),
        country: country.to_string(),
    }
}

fn bucket(topic: &str, keywords: &[&str]) -> TopicBucket {
    TopicBucket {
        topic: topic.to_string(),
        keywords: strings(keywords),
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feeds: strings(&[
                "https://feeds.bbci.co.uk/news/world/africa/rss.xml",
                "https://www.addisstandard.com/feed/",
                "https://www.thereporterethiopia.com/feed/",
                "https://www.theeastafrican.co.ke/rss.xml",
                "https://sudantribune.net/feed/",
                "https://www.hiiraan.com/rss/news.xml",
                "https://www.garoweonline.com/en/rss",
            ]),
            always_include_feeds: strings(&[
                "addisstandard.com",
                "thereporterethiopia.com",
                "hiiraan.com",
                "garoweonline.com",
                "theeastafrican.co.ke",
                "sudantribune.com",
                "sudantribune.net",
            ]),
            blocked_sources: strings(&["borkena.com", "ena.et", "aljazeera.com"]),
            relevance_keywords: strings(&[
                "ethiopia", "ethiopian", "addis ababa", "amhara", "oromia", "oromo", "tigray",
                "tegaru", "eritrea", "eritrean", "asmara", "somalia", "somali", "mogadishu",
                "puntland", "somaliland", "jubaland", "djibouti", "sudan", "sudanese",
                "south sudan", "khartoum", "darfur", "juba", "kenya", "kenyan", "nairobi",
                "horn of africa", "igad", "al-shabaab",
            ]),
            country_rules: vec![
                country(
                    "Ethiopia",
                    &["ethiopia", "ethiopian", "addis ababa", "amhara", "oromia", "oromo", "tigray", "tigrayan", "afar", "abiy ahmed", "fano"],
                ),
                country("Eritrea", &["eritrea", "eritrean", "asmara", "isaias afwerki"]),
                country(
                    "Somalia",
                    &["somalia", "mogadishu", "puntland", "jubaland", "kismayo", "al-shabaab", "al shabaab", "hassan sheikh"],
                ),
                country("Somaliland", &["somaliland", "hargeisa", "berbera"]),
                country("Djibouti", &["djibouti", "djiboutian"]),
                country("South Sudan", &["south sudan", "south sudanese", "juba", "salva kiir"]),
                country(
                    "Sudan",
                    &["sudan", "sudanese", "khartoum", "darfur", "omdurman", "el fasher", "rapid support forces", "rsf"],
                ),
                country("Kenya", &["kenya", "kenyan", "nairobi", "mombasa", "ruto"]),
            ],
            domain_countries: vec![
                domain("addisstandard.com", "Ethiopia"),
                domain("thereporterethiopia.com", "Ethiopia"),
                domain("hiiraan.com", "Somalia"),
                domain("garoweonline.com", "Somalia"),
                domain("sudantribune.net", "Sudan"),
                domain("sudantribune.com", "Sudan"),
                domain("theeastafrican.co.ke", "Kenya"),
            ],
            topic_buckets: vec![
                bucket(
                    "Politics & Governance",
                    &["election", "elections", "parliament", "government", "president", "prime minister", "minister", "opposition", "referendum"],
                ),
                bucket(
                    "Security & Conflict",
                    &["attack", "attacks", "clash", "clashes", "conflict", "war", "military", "fighting", "strike", "strikes", "militants", "troops", "ceasefire"],
                ),
                bucket(
                    "Business & Economy",
                    &["investment", "economy", "economic", "business", "market", "markets", "trade", "company", "debt", "inflation", "imf"],
                ),
            ],
            default_topic: "General".to_string(),
            max_country_tags: 2,

            promo_phrases: strings(&[
                "subscribe",
                "subscription",
                "print edition",
                "bank detail",
                "sign up for our newsletter",
                "advertise with us",
                "support our journalism",
            ]),
            min_summary_chars: 25,
            max_summary_chars: 420,
            max_summary_sentences: 4,

            enrich_domains: strings(&[
                "thereporterethiopia.com",
                "addisstandard.com",
                "hiiraan.com",
                "garoweonline.com",
            ]),
            enrich_summaries: true,
            enrich_min_chars: 120,
            enrich_timeout_secs: 8,

            feed_timeout_secs: 20,
            fetch_concurrency: 4,
            max_articles: 200,
            future_skew_minutes: 5,
            bootstrap_window_hours: 24,

            advance_watermark_on_empty: false,
            renormalize_on_merge: true,
            keep_corpus_on_empty: true,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML override file on top of the defaults.
    #[instrument(level = "info")]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.display(), feeds = config.feeds.len(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Resolve the optional `--config` argument.
    pub fn from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_articles == 0 {
            return Err(Error::Config("max_articles must be at least 1".into()));
        }
        if self.max_summary_chars < self.min_summary_chars {
            return Err(Error::Config(
                "max_summary_chars must not be smaller than min_summary_chars".into(),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(Error::Config("fetch_concurrency must be at least 1".into()));
        }
        if self.default_topic.trim().is_empty() {
            return Err(Error::Config("default_topic must not be empty".into()));
        }
        Ok(())
    }

    /// True when the feed URL is on the always-include list.
    pub fn is_always_included(&self, feed_url: &str) -> bool {
        let low = feed_url.to_lowercase();
        self.always_include_feeds
            .iter()
            .any(|snippet| low.contains(&snippet.to_lowercase()))
    }

    /// True when the host contains any blocked source fragment.
    pub fn is_blocked_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.blocked_sources
            .iter()
            .any(|bad| host.contains(&bad.to_lowercase()))
    }
}
