//! Source adapters that produce raw candidate items.
//!
//! The pipeline depends only on the [`Source`] capability: anything that can
//! hand back a batch of [`RawEntry`] values can be registered next to the RSS
//! feeds.
//!
//! # Contract
//!
//! `fetch` never fails. Network errors, malformed documents and "not modified"
//! responses all come back as an empty batch; the adapter logs a warning and
//! the run carries on with the other sources.
//!
//! # Adapters
//!
//! | Adapter | Status |
//! |---------|--------|
//! | [`RssSource`] | RSS 2.0 / Atom feeds listed in the configuration |
//! | Telegram channels | Not implemented. Needs API credentials; would fill `RawEntry::country_tags` from per-channel settings |

use crate::models::RawEntry;
use async_trait::async_trait;

pub mod rss;

pub use rss::RssSource;

/// What one source produced in one run.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    /// Publisher display name reported by the source (e.g. the feed title).
    pub source_name: String,
    pub entries: Vec<RawEntry>,
}

impl SourceBatch {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identifier, the feed URL for RSS sources.
    fn id(&self) -> &str;

    /// Fetch the current batch of raw entries.
    async fn fetch(&self) -> SourceBatch;
}
