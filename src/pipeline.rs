//! The incremental update run.
//!
//! 1. Read the watermark and the existing corpus.
//! 2. Fetch every source concurrently (bounded) and collect the batches.
//! 3. Filter each entry, then build a normalized, tagged [`Article`].
//! 4. Merge the new articles into the corpus, re-normalize, write it back.
//! 5. Advance the watermark to the newest admitted publish time.
//!
//! Nothing is merged until every fetch has finished, so the merge is one
//! deterministic step regardless of fetch order. Per-feed and per-entry
//! failures only shrink the result; the run itself fails only when the final
//! corpus or watermark write fails.

use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::enrich::PageEnricher;
use crate::error::Result;
use crate::filter::{Admission, FeedTally, IngestionFilter};
use crate::merge::{is_well_formed, merge};
use crate::models::{article_id, canonical_url, host_of, Article, CorpusDocument, RawEntry};
use crate::normalize::{clean_source_name, detect_lang, first_image, strip_html, TextNormalizer};
use crate::sources::rss::build_client;
use crate::sources::{RssSource, Source, SourceBatch};
use crate::store::{CorpusStore, WatermarkStore};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub watermark_before: DateTime<Utc>,
    /// Value on disk after the run, `None` when it was not touched.
    pub watermark_after: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub admitted: usize,
    pub corpus_size: usize,
    pub corpus_written: bool,
    pub feeds: Vec<(String, FeedTally)>,
}

pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Box<dyn Source>>,
    normalizer: TextNormalizer,
    classifier: Classifier,
    enricher: Option<PageEnricher>,
    corpus: CorpusStore,
    watermark: WatermarkStore,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        sources: Vec<Box<dyn Source>>,
        corpus_path: impl Into<PathBuf>,
        watermark_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            normalizer: TextNormalizer::new(&config),
            classifier: Classifier::new(&config),
            enricher: None,
            corpus: CorpusStore::new(corpus_path),
            watermark: WatermarkStore::new(watermark_path, config.bootstrap_window_hours),
            sources,
            config,
        }
    }

    pub fn with_enricher(mut self, enricher: PageEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// One [`RssSource`] per configured feed, sharing a single HTTP client.
    pub fn from_config(
        config: PipelineConfig,
        corpus_path: impl Into<PathBuf>,
        watermark_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let client = build_client(&config.user_agent, Duration::from_secs(config.feed_timeout_secs))?;
        let sources: Vec<Box<dyn Source>> = config
            .feeds
            .iter()
            .map(|url| Box::new(RssSource::new(url.clone(), client.clone())) as Box<dyn Source>)
            .collect();
        let enricher = config
            .enrich_summaries
            .then(|| PageEnricher::new(&config, client.clone()));

        let pipeline = Self::new(config, sources, corpus_path, watermark_path);
        Ok(match enricher {
            Some(enricher) => pipeline.with_enricher(enricher),
            None => pipeline,
        })
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit notion of "now".
    #[instrument(
        level = "info",
        skip(self),
        fields(
            sources = self.sources.len(),
            corpus = %self.corpus.path().display(),
            watermark_file = %self.watermark.path().display()
        )
    )]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let watermark = self.watermark.load(now).await;
        info!(watermark = %watermark.to_rfc3339(), "Strict mode; only entries newer than the watermark are admitted");
        let existing = self.corpus.load().await;

        let batches = self.fetch_all().await;
        let filter = IngestionFilter::new(&self.config, &self.classifier, watermark, now);

        let mut admitted = Vec::new();
        let mut feeds = Vec::with_capacity(batches.len());
        for (feed, batch) in batches {
            let mut tally = FeedTally {
                fetched: batch.entries.len(),
                ..FeedTally::default()
            };
            for entry in &batch.entries {
                match filter.check(entry, &feed) {
                    Ok(admission) => {
                        admitted.push(self.build_article(admission, entry, &batch.source_name).await);
                        tally.admitted += 1;
                    }
                    Err(why) => tally.reject(why),
                }
            }
            info!(
                feed = %feed,
                fetched = tally.fetched,
                admitted = tally.admitted,
                blocked = tally.blocked,
                undated = tally.undated,
                stale = tally.stale,
                future = tally.future,
                off_topic = tally.off_topic,
                missing_fields = tally.missing_fields,
                rejected = tally.rejected(),
                "Feed processed"
            );
            feeds.push((feed, tally));
        }

        let fetched = feeds.iter().map(|(_, t)| t.fetched).sum();
        let mut report = RunReport {
            watermark_before: watermark,
            watermark_after: None,
            fetched,
            admitted: admitted.len(),
            corpus_size: existing.articles.len(),
            corpus_written: false,
            feeds,
        };
        let newest = admitted.iter().map(|a| a.published_at).max();

        let Some(newest) = newest else {
            info!("No new articles since last run");
            if !self.config.keep_corpus_on_empty {
                report.corpus_size = self.write_corpus(Vec::new(), existing.articles, now).await?;
                report.corpus_written = true;
            }
            if self.config.advance_watermark_on_empty {
                report.watermark_after = Some(self.watermark.advance(now).await?);
            } else {
                info!("Watermark not updated");
            }
            return Ok(report);
        };

        report.corpus_size = self.write_corpus(admitted, existing.articles, now).await?;
        report.corpus_written = true;
        report.watermark_after = Some(self.watermark.advance(newest).await?);
        Ok(report)
    }

    async fn fetch_all(&self) -> Vec<(String, SourceBatch)> {
        stream::iter(self.sources.iter())
            .map(|source| async move { (source.id().to_string(), source.fetch().await) })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await
    }

    async fn write_corpus(
        &self,
        new: Vec<Article>,
        existing: Vec<Article>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut articles = merge(new, existing, self.config.max_articles);
        if self.config.renormalize_on_merge {
            articles = articles
                .into_iter()
                .filter_map(|a| self.renormalize(a))
                .collect();
        }
        debug_assert!(is_well_formed(&articles, self.config.max_articles));
        let doc = CorpusDocument {
            generated_at: now,
            articles,
        };
        self.corpus.save(&doc).await?;
        Ok(doc.articles.len())
    }

    async fn build_article(&self, admission: Admission, entry: &RawEntry, feed_name: &str) -> Article {
        let Admission {
            title,
            link,
            published_at,
        } = admission;
        let source_url = canonical_url(&link);
        let source_name = display_name(feed_name, &source_url);

        let mut candidates = entry.text_fields.clone();
        if let Some(enricher) = &self.enricher {
            let feed_summary = self.normalizer.best_candidate(&candidates, &title);
            if enricher.should_enrich(&feed_summary, &source_url) {
                if let Some(description) = enricher.describe(&source_url, &self.normalizer).await {
                    debug!(url = %source_url, "Using page description");
                    candidates.push(description);
                }
            }
        }
        let summary = self.normalizer.summarize(&candidates, &title, &source_name);
        let image_url = entry
            .text_fields
            .iter()
            .find_map(|t| first_image(t))
            .unwrap_or_default();

        self.tag(Article {
            id: article_id(&source_url),
            title,
            summary,
            country_tags: Vec::new(),
            supplied_country_tags: entry.country_tags.clone(),
            topic_tags: Vec::new(),
            published_at,
            link: source_url.clone(),
            source_url,
            source_name,
            image_url,
            lang: String::new(),
        })
    }

    /// Fill the derived tags. Only source-supplied country tags bypass inference.
    fn tag(&self, mut article: Article) -> Article {
        let text = format!("{} {}", article.title, article.summary);
        article.country_tags = self.classifier.countries(
            &format!("{text} {}", article.source_url),
            &article.source_url,
            &article.supplied_country_tags,
        );
        article.topic_tags = self.classifier.topics(&text);
        article.lang = detect_lang(&text).to_string();
        article
    }

    /// Re-apply the current cleaning and tagging rules to a stored article.
    ///
    /// Returns `None` when nothing is left of the title once markup is removed.
    fn renormalize(&self, mut article: Article) -> Option<Article> {
        article.title = strip_html(&article.title);
        if article.title.is_empty() {
            debug!(url = %article.source_url, "Dropping article with empty title");
            return None;
        }
        article.source_name = clean_source_name(&article.source_name);
        article.summary = self
            .normalizer
            .normalize(&article.summary, &article.title, &article.source_name);
        article.id = article_id(&article.source_url);
        article.link = article.source_url.clone();
        Some(self.tag(article))
    }
}

fn display_name(feed_name: &str, source_url: &str) -> String {
    let name = clean_source_name(feed_name);
    if name.is_empty() {
        host_of(source_url)
            .map(|h| h.trim_start_matches("www.").to_string())
            .unwrap_or_default()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::is_near_duplicate;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    const HIIRAAN_FEED: &str = "https://www.hiiraan.com/rss/news.xml";
    const BBC_FEED: &str = "https://feeds.bbci.co.uk/news/world/africa/rss.xml";

    struct FakeSource {
        id: String,
        batch: SourceBatch,
    }

    #[async_trait]
    impl Source for FakeSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn fetch(&self) -> SourceBatch {
            self.batch.clone()
        }
    }

    fn feed(id: &str, name: &str, entries: Vec<RawEntry>) -> Box<dyn Source> {
        Box::new(FakeSource {
            id: id.to_string(),
            batch: SourceBatch {
                source_name: name.to_string(),
                entries,
            },
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap()
    }

    fn raw(title: &str, link: &str, published: Option<DateTime<Utc>>, summary: &str) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            published,
            text_fields: vec![summary.to_string()],
            ..Default::default()
        }
    }

    fn paths(dir: &TempDir) -> (PathBuf, PathBuf) {
        (dir.path().join("articles.json"), dir.path().join("last_run_utc.txt"))
    }

    fn pipeline(dir: &TempDir, config: PipelineConfig, sources: Vec<Box<dyn Source>>) -> Pipeline {
        let (corpus, watermark) = paths(dir);
        Pipeline::new(config, sources, corpus, watermark)
    }

    async fn corpus(path: &Path) -> Vec<Article> {
        CorpusStore::new(path).load().await.articles
    }

    #[tokio::test]
    async fn test_entry_older_than_watermark_leaves_corpus_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (corpus_path, watermark_path) = paths(&dir);
        let watermark = now() - ChronoDuration::hours(2);
        WatermarkStore::new(&watermark_path, 24).advance(watermark).await.unwrap();

        let stored = Article {
            id: article_id("https://www.hiiraan.com/news/old.html"),
            title: "Old story".to_string(),
            summary: "An older story that is already in the corpus.".to_string(),
            country_tags: vec!["Somalia".to_string()],
            supplied_country_tags: vec![],
            topic_tags: vec!["General".to_string()],
            published_at: now() - ChronoDuration::hours(3),
            source_url: "https://www.hiiraan.com/news/old.html".to_string(),
            link: "https://www.hiiraan.com/news/old.html".to_string(),
            source_name: "Hiiraan Online".to_string(),
            image_url: String::new(),
            lang: "en".to_string(),
        };
        CorpusStore::new(&corpus_path)
            .save(&CorpusDocument::new(vec![stored]))
            .await
            .unwrap();
        let before = std::fs::read(&corpus_path).unwrap();

        let entry = raw(
            "Somalia parliament session",
            "https://www.hiiraan.com/news/a.html",
            Some(now() - ChronoDuration::hours(3)),
            "Lawmakers in Mogadishu met to debate the budget.",
        );
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![entry])]);
        let report = p.run_at(now()).await.unwrap();

        assert_eq!(report.admitted, 0);
        assert_eq!(report.feeds[0].1.stale, 1);
        assert!(!report.corpus_written);
        assert_eq!(report.watermark_after, None);
        assert_eq!(std::fs::read(&corpus_path).unwrap(), before);
        assert_eq!(WatermarkStore::new(&watermark_path, 24).stored().await, Some(watermark));
    }

    #[tokio::test]
    async fn test_html_summary_is_cleaned_and_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let entry = raw(
            "Floods hit Mogadishu",
            "https://www.hiiraan.com/news/floods.html",
            Some(now() - ChronoDuration::minutes(1)),
            "<p>Floods hit <b>Mogadishu</b> today.</p>",
        );
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![entry])]);
        let report = p.run_at(now()).await.unwrap();
        assert_eq!(report.admitted, 1);

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.summary, "Floods hit Mogadishu today.");
        assert_eq!(a.country_tags, vec!["Somalia".to_string()]);
        assert_eq!(a.topic_tags, vec!["General".to_string()]);
        assert_eq!(a.source_name, "Hiiraan Online");
        assert_eq!(a.link, a.source_url);
        assert_eq!(a.id.len(), 12);
        assert_eq!(report.watermark_after, Some(now() - ChronoDuration::minutes(1)));
    }

    #[tokio::test]
    async fn test_second_run_replaces_same_story() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://www.hiiraan.com/news/talks.html";
        let first = raw(
            "Somalia talks open",
            url,
            Some(now() - ChronoDuration::hours(2)),
            "Delegates gathered in Mogadishu for the first round of talks.",
        );
        pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![first])])
            .run_at(now())
            .await
            .unwrap();

        let later = now() + ChronoDuration::hours(1);
        let second = raw(
            "Somalia talks open",
            &format!("{url}?utm_source=rss"),
            Some(later - ChronoDuration::minutes(10)),
            "Delegates in Mogadishu agreed on an agenda after a long first day.",
        );
        pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![second])])
            .run_at(later)
            .await
            .unwrap();

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(
            articles[0].summary,
            "Delegates in Mogadishu agreed on an agenda after a long first day."
        );
    }

    #[tokio::test]
    async fn test_blocked_host_never_reaches_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = raw(
            "Ethiopia and Eritrea talks in Addis Ababa",
            "https://www.aljazeera.com/news/ethiopia-eritrea",
            Some(now() - ChronoDuration::minutes(20)),
            "Ethiopian and Eritrean officials met in Addis Ababa.",
        );
        let allowed = raw(
            "Kenya budget passes",
            "https://www.bbc.co.uk/news/kenya-budget",
            Some(now() - ChronoDuration::minutes(30)),
            "Kenyan lawmakers in Nairobi approved the budget.",
        );
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(BBC_FEED, "BBC News", vec![blocked, allowed])]);
        let report = p.run_at(now()).await.unwrap();
        assert_eq!(report.feeds[0].1.blocked, 1);

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles.len(), 1);
        assert!(articles.iter().all(|a| !a.source_url.contains("aljazeera")));
    }

    #[tokio::test]
    async fn test_promotional_summary_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let entry = raw(
            "Somalia budget approved",
            "https://www.hiiraan.com/news/budget.html",
            Some(now() - ChronoDuration::minutes(5)),
            "Subscribe now for full access.",
        );
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![entry])]);
        p.run_at(now()).await.unwrap();

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles[0].summary, "Read the full story on Hiiraan Online.");
    }

    #[tokio::test]
    async fn test_undated_entries_never_admitted() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            raw("Somalia update", "https://www.hiiraan.com/news/1.html", None, "Mogadishu news."),
            raw(
                "Somalia update two",
                "https://www.hiiraan.com/news/2.html",
                Some(now() - ChronoDuration::minutes(3)),
                "More news from Mogadishu today.",
            ),
            raw("Somalia update three", "https://www.hiiraan.com/news/3.html", None, "Kismayo news."),
        ];
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", entries)]);
        let report = p.run_at(now()).await.unwrap();
        assert_eq!(report.feeds[0].1.undated, 2);

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_url, "https://www.hiiraan.com/news/2.html");
    }

    #[tokio::test]
    async fn test_corpus_sorted_and_capped_across_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            max_articles: 5,
            ..PipelineConfig::default()
        };
        let make = |prefix: &str, offset: i64| -> Vec<RawEntry> {
            (0..4)
                .map(|i| {
                    raw(
                        &format!("Somalia story {prefix}{i}"),
                        &format!("https://www.hiiraan.com/news/{prefix}{i}.html"),
                        Some(now() - ChronoDuration::minutes(offset + i * 7)),
                        "Residents of Mogadishu reported heavy rain across the city.",
                    )
                })
                .collect()
        };
        let p = pipeline(
            &dir,
            config,
            vec![
                feed(HIIRAAN_FEED, "Hiiraan Online", make("a", 1)),
                feed("https://www.garoweonline.com/en/rss", "Garowe Online", make("b", 4)),
            ],
        );
        let report = p.run_at(now()).await.unwrap();
        assert_eq!(report.admitted, 8);
        assert_eq!(report.corpus_size, 5);

        let articles = corpus(&paths(&dir).0).await;
        assert!(is_well_formed(&articles, 5));
        assert_eq!(articles[0].title, "Somalia story a0");
        assert!(articles.iter().all(|a| !is_near_duplicate(&a.title, &a.summary)));
    }

    #[tokio::test]
    async fn test_watermark_never_decreases_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            advance_watermark_on_empty: true,
            ..PipelineConfig::default()
        };
        let (_, watermark_path) = paths(&dir);
        let store = WatermarkStore::new(&watermark_path, 24);

        let runs = [
            (now(), Some(now() - ChronoDuration::minutes(30))),
            (now() + ChronoDuration::hours(1), None),
            (now() + ChronoDuration::hours(2), Some(now() - ChronoDuration::hours(3))),
            (now() + ChronoDuration::hours(3), Some(now() + ChronoDuration::hours(2) + ChronoDuration::minutes(30))),
        ];
        let mut last = None;
        for (i, (run_at, published)) in runs.into_iter().enumerate() {
            let entries = published
                .map(|p| {
                    vec![raw(
                        "Somalia news",
                        &format!("https://www.hiiraan.com/news/{i}.html"),
                        Some(p),
                        "Reports from Mogadishu describe the day's events in detail.",
                    )]
                })
                .unwrap_or_default();
            pipeline(&dir, config.clone(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", entries)])
                .run_at(run_at)
                .await
                .unwrap();
            let current = store.stored().await;
            assert!(current >= last, "watermark moved backwards on run {i}");
            last = current;
        }
        assert_eq!(last, Some(now() + ChronoDuration::hours(2) + ChronoDuration::minutes(30)));
    }

    #[tokio::test]
    async fn test_empty_run_without_watermark_advance() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![])]);
        let report = p.run_at(now()).await.unwrap();
        assert_eq!(report.watermark_after, None);
        assert!(!paths(&dir).0.exists());
        assert!(!paths(&dir).1.exists());
    }

    #[tokio::test]
    async fn test_empty_run_rewrites_corpus_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let (corpus_path, _) = paths(&dir);
        std::fs::write(
            &corpus_path,
            r#"[{"title":"Mogadishu port reopens","summary":"<p>Mogadishu port reopens</p>","published_at":"2025-11-30T08:00:00Z","link":"https://www.hiiraan.com/news/port.html","source_name":" - Hiiraan  Online"}]"#,
        )
        .unwrap();
        let config = PipelineConfig {
            keep_corpus_on_empty: false,
            ..PipelineConfig::default()
        };
        let report = pipeline(&dir, config, vec![]).run_at(now()).await.unwrap();
        assert!(report.corpus_written);

        let articles = corpus(&corpus_path).await;
        let a = &articles[0];
        assert_eq!(a.summary, "Read the full story on Hiiraan Online.");
        assert_eq!(a.source_name, "Hiiraan Online");
        assert_eq!(a.country_tags, vec!["Somalia".to_string()]);
        assert_eq!(a.id, article_id("https://www.hiiraan.com/news/port.html"));
    }

    #[tokio::test]
    async fn test_stored_country_tags_are_reinferred() {
        let dir = tempfile::tempdir().unwrap();
        let (corpus_path, _) = paths(&dir);
        std::fs::write(
            &corpus_path,
            r#"[{"title":"South Sudan president visits Juba","summary":"The president arrived in Juba on Monday.","country_tags":["Sudan","South Sudan"],"published_at":"2025-11-30T08:00:00Z","link":"https://www.radiotamazuj.org/en/news/visit"}]"#,
        )
        .unwrap();
        let config = PipelineConfig {
            keep_corpus_on_empty: false,
            ..PipelineConfig::default()
        };
        pipeline(&dir, config, vec![]).run_at(now()).await.unwrap();

        let articles = corpus(&corpus_path).await;
        assert_eq!(articles[0].country_tags, vec!["South Sudan".to_string()]);
        assert!(articles[0].supplied_country_tags.is_empty());
    }

    #[tokio::test]
    async fn test_markup_only_title_dropped_on_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let (corpus_path, _) = paths(&dir);
        std::fs::write(
            &corpus_path,
            r#"[{"title":"<b></b>","summary":"Nothing here.","published_at":"2025-11-30T09:00:00Z","link":"https://www.hiiraan.com/news/empty.html"},{"title":"Mogadishu port reopens","summary":"The port reopened on Sunday.","published_at":"2025-11-30T08:00:00Z","link":"https://www.hiiraan.com/news/port.html"}]"#,
        )
        .unwrap();
        let config = PipelineConfig {
            keep_corpus_on_empty: false,
            ..PipelineConfig::default()
        };
        let report = pipeline(&dir, config, vec![]).run_at(now()).await.unwrap();
        assert_eq!(report.corpus_size, 1);

        let articles = corpus(&corpus_path).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Mogadishu port reopens");
    }

    #[tokio::test]
    async fn test_supplied_country_tags_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut entry = raw(
            "Kenya and Somalia sign deal",
            "https://www.hiiraan.com/news/deal.html",
            Some(now() - ChronoDuration::minutes(2)),
            "Officials from Nairobi and Mogadishu signed a trade deal.",
        );
        entry.country_tags = vec!["Djibouti".to_string()];
        pipeline(&dir, PipelineConfig::default(), vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![entry])])
            .run_at(now())
            .await
            .unwrap();

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles[0].country_tags, vec!["Djibouti".to_string()]);
        assert_eq!(articles[0].supplied_country_tags, vec!["Djibouti".to_string()]);
        assert!(articles[0].topic_tags.contains(&"Business & Economy".to_string()));

        // Still authoritative when the stored article is re-tagged later.
        let config = PipelineConfig {
            keep_corpus_on_empty: false,
            ..PipelineConfig::default()
        };
        pipeline(&dir, config, vec![]).run_at(now()).await.unwrap();
        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(articles[0].country_tags, vec!["Djibouti".to_string()]);
    }

    #[tokio::test]
    async fn test_thin_summary_enriched_from_page() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/port.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta name="description" content="The port of Berbera handled record cargo volumes this quarter, officials in Hargeisa said."></head></html>"#,
            ))
            .mount(&server)
            .await;

        let config = PipelineConfig {
            enrich_domains: vec!["127.0.0.1".to_string()],
            ..PipelineConfig::default()
        };
        let client = build_client("HornUpdatesTest/1.0", Duration::from_secs(5)).unwrap();
        let enricher = PageEnricher::new(&config, client);
        let entry = raw(
            "Berbera port update",
            &format!("{}/news/port.html", server.uri()),
            Some(now() - ChronoDuration::minutes(2)),
            "",
        );
        let dir = tempfile::tempdir().unwrap();
        pipeline(&dir, config, vec![feed(HIIRAAN_FEED, "Hiiraan Online", vec![entry])])
            .with_enricher(enricher)
            .run_at(now())
            .await
            .unwrap();

        let articles = corpus(&paths(&dir).0).await;
        assert_eq!(
            articles[0].summary,
            "The port of Berbera handled record cargo volumes this quarter, officials in Hargeisa said."
        );
        assert_eq!(articles[0].country_tags, vec!["Somaliland".to_string()]);
    }

    #[test]
    fn test_display_name_falls_back_to_host() {
        assert_eq!(display_name("", "https://www.hiiraan.com/a"), "hiiraan.com");
        assert_eq!(display_name("- Addis Standard ", "https://addisstandard.com/a"), "Addis Standard");
    }
}
