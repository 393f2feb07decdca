//! Merge newly admitted articles into the existing corpus.
//!
//! New articles go first, so on an identity-key collision the fresh copy
//! replaces the stored one. The result is ordered newest first (ties broken by
//! identity key so the order is total) and capped.

use crate::models::Article;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

fn newest_first(a: &Article, b: &Article) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.identity_key().cmp(&b.identity_key()))
}

/// Combine, dedupe, sort and cap.
pub fn merge(new: Vec<Article>, existing: Vec<Article>, max_articles: usize) -> Vec<Article> {
    let incoming = new.len() + existing.len();
    let mut seen = HashSet::new();
    let mut merged: Vec<Article> = new
        .into_iter()
        .chain(existing)
        .filter(|a| seen.insert(a.identity_key()))
        .collect();
    let duplicates = incoming - merged.len();

    merged.sort_by(newest_first);
    merged.truncate(max_articles);
    debug!(incoming, duplicates, kept = merged.len(), "Merged corpus");
    merged
}

/// True when the slice is newest-first, unique by identity key, and within the cap.
pub fn is_well_formed(articles: &[Article], max_articles: usize) -> bool {
    let mut seen = HashSet::new();
    articles.len() <= max_articles
        && articles.windows(2).all(|w| w[0].published_at >= w[1].published_at)
        && articles.iter().all(|a| seen.insert(a.identity_key()))
}
