//! Error type shared by every stage of the crawl.
//!
//! Per-URL fetch failures are reported with [`CrawlError::Http`],
//! [`CrawlError::Status`] and [`CrawlError::EmptyBody`] and are swallowed by
//! the fetch scheduler. [`CrawlError::Parse`] means the article markup no
//! longer looks the way the extractor expects. [`CrawlError::Persistence`]
//! means a store file exists but cannot be read back, which always aborts the
//! run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned an empty body")]
    EmptyBody { url: String },

    #[error("rendering {url} failed: {message}")]
    Render { url: String, message: String },

    #[error("unexpected markup in {href}: {reason}")]
    Parse { href: String, reason: String },

    #[error("store file {} is unreadable: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrawlError {
    pub fn parse(href: &str, reason: impl Into<String>) -> Self {
        CrawlError::Parse {
            href: href.to_string(),
            reason: reason.into(),
        }
    }
}
