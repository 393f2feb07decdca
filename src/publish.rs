//! Upload the corpus to the Hugging Face Space that serves the site.
//!
//! The file is pushed through the Hub commit endpoint in one request:
//!
//! ```text
//! POST {endpoint}/api/spaces/{space_id}/commit/main
//! Content-Type: application/x-ndjson
//! Authorization: Bearer <token>
//!
//! {"key":"header","value":{"summary":"Update articles.json","description":""}}
//! {"key":"file","value":{"path":"articles.json","encoding":"base64","content":"..."}}
//! ```
//!
//! # Preconditions
//!
//! - the token file exists and is not blank
//! - the corpus file exists
//!
//! Either failing aborts the publish with [`Error::Publish`] before any
//! network traffic. Nothing local is ever modified.

use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_SPACE_ID: &str = "KalidFan/HornUpdates";
pub const DEFAULT_PATH_IN_REPO: &str = "articles.json";

/// Where the corpus goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub endpoint: String,
    pub space_id: String,
    pub path_in_repo: String,
}

impl Default for PublishTarget {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            space_id: DEFAULT_SPACE_ID.to_string(),
            path_in_repo: DEFAULT_PATH_IN_REPO.to_string(),
        }
    }
}

impl PublishTarget {
    fn commit_url(&self) -> String {
        format!(
            "{}/api/spaces/{}/commit/main",
            self.endpoint.trim_end_matches('/'),
            self.space_id
        )
    }
}

/// Read the API token; a missing or blank file is a publish error.
pub async fn read_token(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).await.map_err(|_| {
        Error::Publish(format!(
            "{} not found. Create it with your Hugging Face API token.",
            path.display()
        ))
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::Publish(format!("{} is empty.", path.display())));
    }
    Ok(token.to_string())
}

/// NDJSON commit payload replacing `path_in_repo` with `contents`.
pub fn commit_body(contents: &[u8], path_in_repo: &str, summary: &str) -> Result<String> {
    let header = json!({
        "key": "header",
        "value": { "summary": summary, "description": "" }
    });
    let file = json!({
        "key": "file",
        "value": {
            "path": path_in_repo,
            "encoding": "base64",
            "content": STANDARD.encode(contents)
        }
    });
    Ok(format!(
        "{}\n{}\n",
        serde_json::to_string(&header)?,
        serde_json::to_string(&file)?
    ))
}

#[instrument(level = "info", skip(client, target), fields(space = %target.space_id, corpus = %corpus_path.display()))]
pub async fn publish_corpus(
    client: &Client,
    target: &PublishTarget,
    token_path: &Path,
    corpus_path: &Path,
) -> Result<()> {
    let token = read_token(token_path).await?;
    if !corpus_path.exists() {
        return Err(Error::Publish(format!(
            "{} not found. Run the update first.",
            corpus_path.display()
        )));
    }
    let contents = fs::read(corpus_path).await?;
    let body = commit_body(
        &contents,
        &target.path_in_repo,
        &format!("Update {}", target.path_in_repo),
    )?;

    info!(bytes = contents.len(), path_in_repo = %target.path_in_repo, "Uploading corpus");
    let response = client
        .post(target.commit_url())
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Publish(format!(
            "hub returned {status}: {}",
            truncate_for_log(&text, 300)
        )));
    }
    info!(%status, "Upload complete");
    Ok(())
}
