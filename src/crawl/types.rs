//! Crawl tree nodes, per-node outcomes and run summaries.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::error::{FetchError, ParseError};

/// Level of the crawl tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    /// Sport page listing leagues.
    Sport,
    /// League page listing games and markets.
    League,
    /// Market odds table, linked straight from the league page.
    Market,
}

/// A link discovered on a parent page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlNode {
    /// Level of the page the link points to.
    pub scope: Scope,
    /// Display name of the link.
    pub name: String,
    /// Link as written on the parent page.
    pub link: String,
    /// Absolute URL.
    pub url: String,
}

/// Why a node was not (fully) processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// Listing element has no link attribute.
    #[error("no link")]
    MissingLink,
    /// Market name is in the exclusion set.
    #[error("excluded market")]
    Excluded,
    /// League has a game in play and in-play games are not crawled.
    #[error("game in play")]
    InPlay,
    /// Page could not be loaded.
    #[error("fetch failed: {0}")]
    Fetch(FetchError),
    /// Page loaded but its structure was unusable.
    #[error("parse failed: {0}")]
    Parse(ParseError),
}

impl SkipReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingLink => "missing_link",
            SkipReason::Excluded => "excluded",
            SkipReason::InPlay => "in_play",
            SkipReason::Fetch(_) => "fetch",
            SkipReason::Parse(_) => "parse",
        }
    }

    /// Whether this skip is a failure rather than policy.
    pub fn is_failure(&self) -> bool {
        matches!(self, SkipReason::Fetch(_) | SkipReason::Parse(_))
    }
}

/// Result of processing one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Listing page processed; `children` nodes were queued.
    Visited {
        /// Child nodes found.
        children: usize,
    },
    /// Market page evaluated.
    Evaluated {
        /// Whether an opportunity was found.
        found: bool,
    },
    /// Node skipped; siblings continue.
    Skipped(SkipReason),
}

/// A node the crawl skipped, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    /// Level of the skipped node.
    pub scope: Scope,
    /// Node name.
    pub name: String,
    /// Node URL, when known.
    pub url: Option<String>,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Counters and skips of one crawl or re-verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Sport pages loaded.
    pub sports: usize,
    /// League pages loaded.
    pub leagues: usize,
    /// Market pages evaluated.
    pub markets_evaluated: usize,
    /// Opportunities found.
    pub opportunities: usize,
    /// Every skipped node, in visit order.
    pub skipped: Vec<SkippedNode>,
}

impl CrawlSummary {
    /// Skipped nodes at `scope`.
    pub fn skipped_at(&self, scope: Scope) -> impl Iterator<Item = &SkippedNode> {
        self.skipped.iter().filter(move |s| s.scope == scope)
    }

    /// Number of skips caused by fetch or parse failures.
    pub fn failures(&self) -> usize {
        self.skipped.iter().filter(|s| s.reason.is_failure()).count()
    }
}

/// Live crawl counters shared with the status API.
#[derive(Debug, Clone, Default)]
pub struct CrawlProgress {
    inner: Arc<ProgressInner>,
}

#[derive(Debug, Default)]
struct ProgressInner {
    running: AtomicBool,
    sports: AtomicU64,
    leagues: AtomicU64,
    markets: AtomicU64,
    opportunities: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of [`CrawlProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Whether a crawl is in progress.
    pub running: bool,
    /// Sport pages loaded.
    pub sports: u64,
    /// League pages loaded.
    pub leagues: u64,
    /// Market pages evaluated.
    pub markets: u64,
    /// Opportunities found.
    pub opportunities: u64,
    /// Nodes skipped.
    pub skipped: u64,
}

impl CrawlProgress {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the crawl as running or finished.
    pub fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn sport(&self) {
        self.inner.sports.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn league(&self) {
        self.inner.leagues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn market(&self, found: bool) {
        self.inner.markets.fetch_add(1, Ordering::Relaxed);
        if found {
            self.inner.opportunities.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn skipped(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            running: self.inner.running.load(Ordering::SeqCst),
            sports: self.inner.sports.load(Ordering::Relaxed),
            leagues: self.inner.leagues.load(Ordering::Relaxed),
            markets: self.inner.markets.load(Ordering::Relaxed),
            opportunities: self.inner.opportunities.load(Ordering::Relaxed),
            skipped: self.inner.skipped.load(Ordering::Relaxed),
        }
    }
}
