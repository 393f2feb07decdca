//! Crate-wide error type.
//!
//! Feed failures are absorbed at the source boundary and never reach this
//! type. It covers configuration loading and the file and network writes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{} not found", .0.display())]
    MissingInput(std::path::PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, Error>;
