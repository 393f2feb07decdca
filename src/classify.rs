//! Keyword classification: country tags, topic tags, and topical relevance.
//!
//! Country rules are tried in configuration order. Once a rule matches, its
//! matches are blanked out of the working text, so a later, shorter rule
//! ("Sudan") cannot fire on text an earlier, longer one already claimed
//! ("South Sudan"). Topic buckets are independent of each other.

use crate::config::PipelineConfig;
use crate::models::host_of;
use itertools::Itertools;
use regex::Regex;
use tracing::warn;

/// Word-bounded, case-insensitive alternation over the given names.
fn alternation(names: &[String]) -> Option<Regex> {
    let parts: Vec<String> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| {
            n.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)\b(?:{})\b", parts.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, "Skipping keyword rule that does not compile");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    country_rules: Vec<(String, Regex)>,
    domain_countries: Vec<(String, String)>,
    topic_buckets: Vec<(String, Regex)>,
    relevance: Option<Regex>,
    default_topic: String,
    max_country_tags: usize,
}

impl Classifier {
    pub fn new(config: &PipelineConfig) -> Self {
        let country_rules = config
            .country_rules
            .iter()
            .filter_map(|rule| alternation(&rule.names).map(|re| (rule.country.clone(), re)))
            .collect();
        let topic_buckets = config
            .topic_buckets
            .iter()
            .filter_map(|b| alternation(&b.keywords).map(|re| (b.topic.clone(), re)))
            .collect();
        let domain_countries = config
            .domain_countries
            .iter()
            .map(|d| (d.domain.to_lowercase(), d.country.clone()))
            .collect();
        Self {
            country_rules,
            domain_countries,
            topic_buckets,
            relevance: alternation(&config.relevance_keywords),
            default_topic: config.default_topic.clone(),
            max_country_tags: config.max_country_tags,
        }
    }

    /// Country tags for an item.
    ///
    /// Externally supplied tags win outright. Otherwise the rules run over
    /// `text` (title, summary and URL), and when none match the publisher's
    /// domain default is used.
    pub fn countries(&self, text: &str, source_url: &str, supplied: &[String]) -> Vec<String> {
        let supplied: Vec<String> = supplied
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unique()
            .take(self.max_country_tags)
            .collect();
        if !supplied.is_empty() {
            return supplied;
        }

        let mut working = text.to_string();
        let mut found = Vec::new();
        for (country, re) in &self.country_rules {
            if re.is_match(&working) {
                found.push(country.clone());
                working = re.replace_all(&working, " ").into_owned();
            }
        }
        let found: Vec<String> = found
            .into_iter()
            .unique()
            .take(self.max_country_tags)
            .collect();
        if !found.is_empty() {
            return found;
        }

        self.domain_default(source_url).into_iter().collect()
    }

    fn domain_default(&self, source_url: &str) -> Option<String> {
        let host = host_of(source_url)?;
        self.domain_countries
            .iter()
            .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
            .map(|(_, country)| country.clone())
    }

    /// Every matching topic bucket, or the default topic alone.
    pub fn topics(&self, text: &str) -> Vec<String> {
        let topics: Vec<String> = self
            .topic_buckets
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(topic, _)| topic.clone())
            .unique()
            .collect();
        if topics.is_empty() {
            vec![self.default_topic.clone()]
        } else {
            topics
        }
    }

    /// Whether the text mentions the region at all.
    pub fn is_relevant(&self, text: &str) -> bool {
        self.relevance.as_ref().is_some_and(|re| re.is_match(text))
    }
}
