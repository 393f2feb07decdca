//! RSS / Atom feed source backed by `feed-rs`.

use super::{Source, SourceBatch};
use crate::error::Result;
use crate::models::RawEntry;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Build the shared HTTP client with the identifying user agent.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .build()?;
    Ok(client)
}

/// One feed endpoint.
#[derive(Debug, Clone)]
pub struct RssSource {
    url: String,
    client: Client,
}

impl RssSource {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    async fn fetch_feed(&self) -> Result<SourceBatch> {
        let response = self.client.get(&self.url).send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            info!(feed = %self.url, "Feed not modified");
            return Ok(SourceBatch::empty());
        }
        let response = response.error_for_status()?;
        let body = response.bytes().await?;
        debug!(feed = %self.url, bytes = body.len(), "Downloaded feed");
        parse_feed(&body)
    }
}

#[async_trait]
impl Source for RssSource {
    fn id(&self) -> &str {
        &self.url
    }

    #[instrument(level = "info", skip_all, fields(feed = %self.url))]
    async fn fetch(&self) -> SourceBatch {
        match self.fetch_feed().await {
            Ok(batch) => {
                info!(entries = batch.entries.len(), source = %batch.source_name, "Fetched feed");
                batch
            }
            Err(e) => {
                warn!(error = %e, "Feed unavailable; treating as empty");
                SourceBatch::empty()
            }
        }
    }
}

/// Parse a feed document into a [`SourceBatch`].
pub fn parse_feed(body: &[u8]) -> Result<SourceBatch> {
    let feed = feed_rs::parser::parse(body)?;
    let source_name = feed.title.map(|t| t.content).unwrap_or_default();
    let entries = feed.entries.into_iter().map(raw_entry).collect();
    Ok(SourceBatch {
        source_name,
        entries,
    })
}

fn raw_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty());

    let mut text_fields = Vec::new();
    if let Some(body) = entry.content.and_then(|c| c.body) {
        text_fields.push(body);
    }
    if let Some(summary) = entry.summary {
        text_fields.push(summary.content);
    }
    text_fields.extend(
        entry
            .media
            .into_iter()
            .filter_map(|m| m.description.map(|d| d.content)),
    );
    text_fields.retain(|t| !t.trim().is_empty());

    RawEntry {
        title: entry.title.map(|t| t.content),
        link,
        published: entry.published,
        updated: entry.updated,
        text_fields,
        country_tags: Vec::new(),
    }
}
