//! Mock page provider for unit testing.
//!
//! This module provides an in-memory site that can be crawled in tests
//! without making real network requests, plus builders for pages shaped
//! like the odds comparison site.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::element::{Page, PageElement};
use super::PageProvider;
use crate::error::FetchError;

/// Configuration for mock provider behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether every fetch fails.
    pub fail_all: bool,
    /// Simulated latency in milliseconds for URLs without their own delay.
    pub latency_ms: u64,
}

/// In-memory [`PageProvider`].
#[derive(Debug, Clone, Default)]
pub struct MockPageProvider {
    /// Mock configuration.
    config: MockConfig,
    /// Pages by absolute URL.
    pages: Arc<Mutex<HashMap<String, Page>>>,
    /// URLs that fail with a status error.
    failing: Arc<Mutex<HashSet<String>>>,
    /// Per-URL latency in milliseconds.
    latencies: Arc<Mutex<HashMap<String, u64>>>,
    /// URLs requested, in order.
    requests: Arc<Mutex<Vec<String>>>,
    /// URLs whose fetch finished, in order.
    completions: Arc<Mutex<Vec<String>>>,
}

impl MockPageProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Serve `root` at `url`.
    pub fn add_page(&self, url: impl Into<String>, root: PageElement) {
        let url = url.into();
        let page = Page::new(url.clone(), "", root);
        self.pages.lock().unwrap().insert(url, page);
    }

    /// Make fetches of `url` fail with HTTP 500.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.failing.lock().unwrap().insert(url.into());
    }

    /// Delay fetches of `url` by `ms` milliseconds.
    pub fn delay_url(&self, url: impl Into<String>, ms: u64) {
        self.latencies.lock().unwrap().insert(url.into(), ms);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// URLs whose fetch has finished, in completion order.
    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

impl PageProvider for MockPageProvider {
    async fn fetch(&self, url: &str, label: &str) -> Result<Page, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let latency = self
            .latencies
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(self.config.latency_ms);
        if latency > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency)).await;
        }
        self.completions.lock().unwrap().push(url.to_string());

        if self.config.fail_all || self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }

        let pages = self.pages.lock().unwrap();
        match pages.get(url) {
            Some(page) => {
                let mut page = page.clone();
                page.name = label.to_string();
                Ok(page)
            }
            None => Err(FetchError::Unavailable {
                url: url.to_string(),
            }),
        }
    }
}

/// Page listing links as elements of one class (sport menu, league list,
/// market list).
pub fn listing_page(class: &str, links: &[(&str, &str)]) -> PageElement {
    let items = links.iter().map(|(name, href)| {
        PageElement::new("a")
            .with_class(class)
            .with_attr("href", *href)
            .with_text(*name)
    });
    PageElement::new("html").with_child(PageElement::new("body").with_children(items))
}

/// Mark a page as having a game in play.
pub fn with_in_play_marker(page: PageElement) -> PageElement {
    page.with_child(PageElement::new("span").with_class("no-arrow in-play"))
}

/// One bookmaker cell of an odds row.
#[derive(Debug, Clone, PartialEq)]
pub enum OddsCell {
    /// Bookmaker quotes these decimal odds.
    Price(&'static str),
    /// Cell carries odds but is flagged non-participating (`np`).
    NotParticipating(&'static str),
    /// Cell carries numeric odds but an empty raw value.
    Blank(&'static str),
    /// Closed column; ends the row scan.
    Closed,
    /// No odds at all.
    Empty,
}

/// Builder for market pages laid out like the odds comparison table.
///
/// Column 0 of every row is the selection cell; bookmaker columns follow,
/// so header column `i + 1` names bookmaker `i`.
#[derive(Debug, Clone, Default)]
pub struct MarketPageBuilder {
    bookmakers: Vec<String>,
    rows: Vec<(String, Vec<OddsCell>)>,
}

impl MarketPageBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bookmaker header names, in column order.
    pub fn bookmakers(mut self, names: &[&str]) -> Self {
        self.bookmakers = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Add an outcome row.
    pub fn row(mut self, selection: &str, cells: Vec<OddsCell>) -> Self {
        self.rows.push((selection.to_string(), cells));
        self
    }

    /// Add an outcome row of plain prices.
    pub fn prices(self, selection: &str, prices: &[&'static str]) -> Self {
        let cells = prices.iter().map(|p| OddsCell::Price(*p)).collect();
        self.row(selection, cells)
    }

    /// Build the page tree.
    pub fn build(self) -> PageElement {
        let header = PageElement::new("tr")
            .with_class("eventTableHeader")
            .with_child(PageElement::new("td"))
            .with_children(self.bookmakers.iter().map(|name| {
                PageElement::new("td").with_child(
                    PageElement::new("aside").with_child(
                        PageElement::new("a")
                            .with_attr("title", name.as_str())
                            .with_text(name.as_str()),
                    ),
                )
            }));

        let rows = self.rows.into_iter().map(|(selection, cells)| {
            let name_cell = PageElement::new("td").with_class("sel").with_child(
                PageElement::new("span")
                    .with_class("beta-sprite add-to-bet-basket")
                    .with_attr("data-name", selection.as_str()),
            );
            PageElement::new("tr")
                .with_class("diff-row evTabRow bc")
                .with_child(name_cell)
                .with_children(cells.into_iter().map(odds_cell))
        });

        PageElement::new("html").with_child(
            PageElement::new("body").with_child(
                PageElement::new("table")
                    .with_child(header)
                    .with_children(rows),
            ),
        )
    }
}

fn odds_cell(cell: OddsCell) -> PageElement {
    let td = PageElement::new("td");
    match cell {
        OddsCell::Price(odds) => td
            .with_class("o")
            .with_attr("data-odig", odds)
            .with_attr("data-o", odds)
            .with_text(odds),
        OddsCell::NotParticipating(odds) => td
            .with_class("o np")
            .with_attr("data-odig", odds)
            .with_attr("data-o", odds),
        OddsCell::Blank(odds) => td
            .with_class("o")
            .with_attr("data-odig", odds)
            .with_attr("data-o", ""),
        OddsCell::Closed => td.with_class("wo-col"),
        OddsCell::Empty => td.with_class("o"),
    }
}
