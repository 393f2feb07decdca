//! Command-line interface definitions for Horn Updates.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Paths can be provided via command-line flags or environment
//! variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Horn Updates pipeline.
///
/// # Examples
///
/// ```sh
/// # Pull new stories into articles.json
/// horn_updates update
///
/// # With a configuration override and custom state files
/// horn_updates --config horn.yaml --corpus data/articles.json update
///
/// # Regenerate the derived files and push the corpus
/// horn_updates sitemap && horn_updates rss && horn_updates publish
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML file overriding the built-in configuration
    #[arg(short, long, global = true, env = "HORN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path of the article corpus
    #[arg(long, global = true, env = "HORN_CORPUS", default_value = "articles.json")]
    pub corpus: PathBuf,

    /// Path of the watermark file
    #[arg(long, global = true, env = "HORN_WATERMARK", default_value = "last_run_utc.txt")]
    pub watermark: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Fetch feeds and merge new stories into the corpus
    Update,

    /// Write the reader sitemap (and its gzip copy) from the corpus
    Sitemap {
        #[arg(short, long, default_value = "sitemap-reader.xml")]
        output: PathBuf,

        /// Base URL of the public site
        #[arg(long, default_value = crate::outputs::SITE_URL)]
        site: String,
    },

    /// Write the RSS feed from the corpus
    Rss {
        #[arg(short, long, default_value = "rss.xml")]
        output: PathBuf,

        /// Base URL of the public site
        #[arg(long, default_value = crate::outputs::SITE_URL)]
        site: String,
    },

    /// Upload the corpus to the Hugging Face Space
    Publish {
        /// File holding the Hugging Face API token
        #[arg(long, env = "HF_TOKEN_FILE", default_value = "hf_token.txt")]
        token_file: PathBuf,

        #[arg(long, default_value = crate::publish::DEFAULT_SPACE_ID)]
        space_id: String,

        #[arg(long, env = "HF_ENDPOINT", default_value = crate::publish::DEFAULT_ENDPOINT)]
        endpoint: String,

        #[arg(long, default_value = crate::publish::DEFAULT_PATH_IN_REPO)]
        path_in_repo: String,
    },
}
