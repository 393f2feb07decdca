//! Ingestion filter: decides which raw entries are admitted into a run.
//!
//! Checks run in a fixed order and the first failure drops the entry:
//!
//! 1. non-empty title and a link with a host
//! 2. link host not on the blocked list
//! 3. a publish (or update) timestamp exists
//! 4. timestamp strictly newer than the watermark
//! 5. timestamp no later than now plus the skew tolerance
//! 6. topical relevance, unless the feed is always included
//!
//! Drops are data, not errors. They only show up in the per-feed [`FeedTally`].

use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::models::{host_of, RawEntry};
use crate::normalize::strip_html;
use chrono::{DateTime, Duration, Utc};

/// Why an entry was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingTitleOrLink,
    BlockedSource,
    MissingTimestamp,
    NotNewerThanWatermark,
    FutureDated,
    OffTopic,
}

/// The fields an admitted entry is guaranteed to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
}

pub struct IngestionFilter<'a> {
    config: &'a PipelineConfig,
    classifier: &'a Classifier,
    watermark: DateTime<Utc>,
    horizon: DateTime<Utc>,
}

impl<'a> IngestionFilter<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        classifier: &'a Classifier,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            classifier,
            watermark,
            horizon: now + Duration::minutes(config.future_skew_minutes),
        }
    }

    pub fn check(&self, entry: &RawEntry, feed_url: &str) -> Result<Admission, Rejection> {
        let title = entry.title.as_deref().map(strip_html).unwrap_or_default();
        let link = entry.link.as_deref().map(str::trim).unwrap_or_default();
        let Some(host) = host_of(link).filter(|_| !title.is_empty()) else {
            return Err(Rejection::MissingTitleOrLink);
        };

        if self.config.is_blocked_host(&host) {
            return Err(Rejection::BlockedSource);
        }

        let published_at = entry.timestamp().ok_or(Rejection::MissingTimestamp)?;
        if published_at <= self.watermark {
            return Err(Rejection::NotNewerThanWatermark);
        }
        if published_at > self.horizon {
            return Err(Rejection::FutureDated);
        }

        if !self.config.is_always_included(feed_url) {
            let body = entry
                .text_fields
                .iter()
                .map(|t| strip_html(t))
                .collect::<Vec<_>>()
                .join(" ");
            if !self.classifier.is_relevant(&format!("{title} {body}")) {
                return Err(Rejection::OffTopic);
            }
        }

        Ok(Admission {
            title,
            link: link.to_string(),
            published_at,
        })
    }
}

/// Per-feed admission counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedTally {
    pub fetched: usize,
    pub admitted: usize,
    pub missing_fields: usize,
    pub blocked: usize,
    pub undated: usize,
    pub stale: usize,
    pub future: usize,
    pub off_topic: usize,
}

impl FeedTally {
    pub fn reject(&mut self, why: Rejection) {
        let slot = match why {
            Rejection::MissingTitleOrLink => &mut self.missing_fields,
            Rejection::BlockedSource => &mut self.blocked,
            Rejection::MissingTimestamp => &mut self.undated,
            Rejection::NotNewerThanWatermark => &mut self.stale,
            Rejection::FutureDated => &mut self.future,
            Rejection::OffTopic => &mut self.off_topic,
        };
        *slot += 1;
    }

    pub fn rejected(&self) -> usize {
        self.missing_fields + self.blocked + self.undated + self.stale + self.future + self.off_topic
    }
}
