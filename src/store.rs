//! On-disk state: the corpus document and the watermark timestamp.
//!
//! Both files are replaced wholesale through [`write_atomic`], so a failed
//! write leaves the previous content in place.

use crate::error::Result;
use crate::models::{parse_timestamp, CorpusDocument};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Write `contents` to a sibling temp file, then rename it over `path`.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    if let Err(e) = fs::write(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// The persisted `articles.json`.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the corpus; a missing or corrupt file reads as empty.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> CorpusDocument {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing corpus; starting empty");
                return CorpusDocument::new(Vec::new());
            }
            Err(e) => {
                warn!(error = %e, "Corpus unreadable; starting empty");
                return CorpusDocument::new(Vec::new());
            }
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                let doc = CorpusDocument::from_json_value(value);
                info!(articles = doc.articles.len(), "Loaded existing corpus");
                doc
            }
            Err(e) => {
                warn!(error = %e, "Corpus is not valid JSON; starting empty");
                CorpusDocument::new(Vec::new())
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), articles = doc.articles.len()))]
    pub async fn save(&self, doc: &CorpusDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        write_atomic(&self.path, json.as_bytes()).await?;
        info!("Wrote corpus");
        Ok(())
    }
}

/// The `last_run_utc.txt` watermark.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
    bootstrap: Duration,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>, bootstrap_hours: i64) -> Self {
        Self {
            path: path.into(),
            bootstrap: Duration::hours(bootstrap_hours),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored value, if the file exists and parses.
    pub async fn stored(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(&self.path).await.ok()?;
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            warn!(path = %self.path.display(), "Watermark file is corrupt; ignoring it");
        }
        parsed
    }

    /// The effective watermark: the stored value, or `now` minus the bootstrap window.
    pub async fn load(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.stored().await {
            Some(ts) => ts,
            None => {
                let ts = now - self.bootstrap;
                info!(watermark = %ts.to_rfc3339(), "No usable watermark; using bootstrap window");
                ts
            }
        }
    }

    /// Move the watermark forward to `candidate`. Never moves it backwards;
    /// returns the value now on disk.
    #[instrument(level = "info", skip(self))]
    pub async fn advance(&self, candidate: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if let Some(current) = self.stored().await {
            if current >= candidate {
                info!(current = %current.to_rfc3339(), "Watermark already at or past candidate");
                return Ok(current);
            }
        }
        let text = candidate.to_rfc3339_opts(SecondsFormat::AutoSi, false);
        write_atomic(&self.path, text.as_bytes()).await?;
        info!(watermark = %text, "Advanced watermark");
        Ok(candidate)
    }
}
