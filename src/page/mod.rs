//! Page access for the crawler.
//!
//! This module handles:
//! - The [`PageProvider`] capability used by the crawl
//! - The owned element tree pages are parsed into
//! - HTTP fetching and HTML parsing
//! - Mock provider and odds-site page builders for testing

pub mod client;
pub mod element;
pub mod mock;

use std::future::Future;

use url::Url;

use crate::error::FetchError;

pub use client::HttpPageProvider;
pub use element::{Page, PageElement};
pub use mock::{MarketPageBuilder, MockConfig, MockPageProvider, OddsCell};

/// Anything that can turn a URL into a parsed page.
pub trait PageProvider: Send + Sync {
    /// Fetch `url` and label the resulting page with `label`.
    fn fetch(&self, url: &str, label: &str) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

/// Resolve a (possibly relative) link against a base URL.
pub fn resolve_link(base: &str, link: &str) -> Result<String, FetchError> {
    let base = Url::parse(base).map_err(|e| FetchError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    base.join(link.trim())
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: link.to_string(),
            reason: e.to_string(),
        })
}
