//! Derived outputs built from the corpus.
//!
//! Both are read-only projections of `articles.json`:
//!
//! - [`sitemap`]: reader deep links for search engines, plain and gzipped
//! - [`rss`]: an RSS 2.0 channel with the most recent stories
//!
//! # Output Structure
//!
//! ```text
//! site_dir/
//! ├── sitemap-reader.xml
//! ├── sitemap-reader.xml.gz
//! └── rss.xml
//! ```

use crate::error::{Error, Result};
use crate::models::CorpusDocument;
use crate::store::CorpusStore;
use std::path::Path;

pub mod rss;
pub mod sitemap;

/// Public site the outputs point at.
pub const SITE_URL: &str = "https://hornupdates.com";

/// Load the corpus for an output step. Unlike the update run, a missing
/// corpus is an error here.
pub async fn read_corpus(path: &Path) -> Result<CorpusDocument> {
    let store = CorpusStore::new(path);
    if !store.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    Ok(store.load().await)
}
