//! Site traversal.
//!
//! This module handles:
//! - Walking sport → league → market pages from the home page
//! - Skip policy (missing links, excluded markets, in-play leagues)
//! - Failure isolation: a failed node is recorded and its siblings continue
//! - Re-verification of previously found opportunities

pub mod traversal;
pub mod types;

pub use traversal::{Crawler, MarketResult};
pub use types::{
    CrawlNode, CrawlProgress, CrawlSummary, NodeOutcome, ProgressSnapshot, Scope, SkipReason,
    SkippedNode,
};
