//! # Horn Updates
//!
//! An incremental news ingestion pipeline for the Horn of Africa. It polls a
//! fixed set of RSS/Atom feeds, keeps only stories newer than the last
//! successful run, cleans and tags them, and merges them into a bounded,
//! deduplicated JSON corpus that the public site reads.
//!
//! ## Features
//!
//! - Strict, watermark-based admission: undated or already-seen stories never
//!   enter the corpus
//! - HTML-to-text summaries with boilerplate and promotional text removed
//! - Rule-based country and topic tagging
//! - Reader sitemap, RSS feed, and Hugging Face Space upload
//!
//! Only RSS/Atom feeds are ingested. The Telegram channel adapter is not
//! implemented; it would plug in as another [`sources::Source`].
//!
//! ## Usage
//!
//! ```sh
//! horn_updates update
//! horn_updates sitemap
//! horn_updates rss
//! horn_updates publish
//! ```
//!
//! ## Architecture
//!
//! The `update` command follows a pipeline architecture:
//! 1. **Fetching**: Download every feed (bounded concurrency, 4 at a time)
//! 2. **Filtering**: Drop blocked, undated, stale, future-dated and off-topic entries
//! 3. **Normalizing**: Build plain-text summaries and country/topic tags
//! 4. **Merging**: Dedupe against the stored corpus, sort, cap, write, advance the watermark

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod classify;
mod cli;
mod config;
mod enrich;
mod error;
mod filter;
mod merge;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod publish;
mod sources;
mod store;
mod utils;

use cli::{Cli, Commands};
use config::PipelineConfig;
use outputs::{read_corpus, rss, sitemap};
use pipeline::Pipeline;
use publish::{publish_corpus, PublishTarget};
use sources::rss::build_client;
use utils::ensure_writable_parent;

const PUBLISH_TIMEOUT_SECS: u64 = 120;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("horn_updates starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(command = ?args.command, corpus = %args.corpus.display(), watermark = %args.watermark.display(), "Parsed CLI arguments");

    let config = match PipelineConfig::from_optional_path(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    let outcome = match args.command {
        Commands::Update => update(config, &args.corpus, &args.watermark).await,
        Commands::Sitemap { output, site } => write_sitemap(&args.corpus, &site, &output).await,
        Commands::Rss { output, site } => write_rss(&args.corpus, &site, &output).await,
        Commands::Publish {
            token_file,
            space_id,
            endpoint,
            path_in_repo,
        } => {
            let target = PublishTarget {
                endpoint,
                space_id,
                path_in_repo,
            };
            publish(&config, &target, &token_file, &args.corpus).await
        }
    };
    if let Err(e) = outcome {
        error!(error = %e, "Command failed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

async fn update(config: PipelineConfig, corpus: &Path, watermark: &Path) -> error::Result<()> {
    // Fail before fetching anything if the state files cannot be written.
    ensure_writable_parent(corpus).await?;
    ensure_writable_parent(watermark).await?;

    info!(feeds = config.feeds.len(), "Starting update");
    let pipeline = Pipeline::from_config(config, corpus, watermark)?;
    let report = pipeline.run().await?;
    info!(
        fetched = report.fetched,
        admitted = report.admitted,
        corpus_size = report.corpus_size,
        corpus_written = report.corpus_written,
        watermark_before = %report.watermark_before.to_rfc3339(),
        watermark_after = ?report.watermark_after.map(|w| w.to_rfc3339()),
        "Update complete"
    );
    Ok(())
}

async fn write_sitemap(corpus: &Path, site: &str, output: &Path) -> error::Result<()> {
    let doc = read_corpus(corpus).await?;
    sitemap::write_sitemap(&doc.articles, site, output).await?;
    Ok(())
}

async fn write_rss(corpus: &Path, site: &str, output: &Path) -> error::Result<()> {
    let doc = read_corpus(corpus).await?;
    rss::write_rss(&doc.articles, site, output).await?;
    Ok(())
}

async fn publish(
    config: &PipelineConfig,
    target: &PublishTarget,
    token_file: &Path,
    corpus: &Path,
) -> error::Result<()> {
    let client = build_client(&config.user_agent, Duration::from_secs(PUBLISH_TIMEOUT_SECS))?;
    publish_corpus(&client, target, token_file, corpus).await
}
