//! Odds comparison crawler that finds sports betting arbitrage opportunities.
//!
//! The crawler walks an odds comparison site from its sport menu down to the
//! individual market tables, takes the best price quoted for each outcome and
//! checks whether backing every outcome at those prices guarantees a profit.
//!
//! # Strategy
//!
//! For decimal odds `o_1..o_n` on mutually exclusive outcomes, the payout of a
//! stake `S` split as `S * p / o_i` is the same whichever outcome wins:
//!
//! ```text
//! p = 1 / (1/o_1 + ... + 1/o_n)
//!
//! Home @ 2.20, Away @ 2.15
//! ─────────────────────────
//! p      = 1 / (0.4545 + 0.4651) = 1.0874
//! Stake  = 100 -> 49.43 on Home, 50.57 on Away
//! Payout = 108.74 either way, profit 8.74
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`page`]: Page access (HTTP provider, element tree, mock provider)
//! - [`arbitrage`]: Odds table extraction and opportunity evaluation
//! - [`crawl`]: Sport → league → market traversal
//! - [`sink`]: Opportunity collection, report file and notifications
//! - [`api`]: HTTP API for health/status/metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod crawl;
pub mod error;
pub mod metrics;
pub mod page;
pub mod sink;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
