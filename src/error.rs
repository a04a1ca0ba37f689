//! Unified error types for the crawler.

use thiserror::Error;

use crate::crawl::SkipReason;

/// Unified error type for the crawler.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Crawl could not run.
    #[error("crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Result sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Page fetch error outside a crawl (single market checks).
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Page structure error outside a crawl.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// HTTP client construction error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A single market check skipped the page for a non-failure reason.
    #[error("market skipped: {0}")]
    Skipped(SkipReason),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete (DNS, TLS, timeout, body read).
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Link could not be resolved into an absolute URL.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// Offending link.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// No page exists at this URL.
    #[error("page {url} unavailable")]
    Unavailable {
        /// Requested URL.
        url: String,
    },
}

/// Expected page structure missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Odds attribute is not a decimal number.
    #[error("odds value {value:?} is not a decimal")]
    InvalidOdds {
        /// Raw attribute text.
        value: String,
    },
}

/// Errors that abort a whole crawl.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Home page could not be fetched, so there is nothing to traverse.
    #[error("root page unavailable: {0}")]
    RootUnavailable(#[source] FetchError),
}

/// Result sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Report file could not be written.
    #[error("failed to write report {path}: {source}")]
    Io {
        /// Report path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Opportunities could not be serialized.
    #[error("failed to serialize opportunities: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SkipReason> for BotError {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::Fetch(e) => BotError::Fetch(e),
            SkipReason::Parse(e) => BotError::Parse(e),
            other => BotError::Skipped(other),
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
