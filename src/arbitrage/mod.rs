//! Arbitrage module for extracting odds and detecting opportunities.
//!
//! This module handles:
//! - Best-odds extraction from market odds tables
//! - Implied payout and stake calculations
//! - Fractional odds display
//! - Opportunity detection on market pages

pub mod calculator;
pub mod detector;
pub mod extractor;
pub mod fraction;

pub use calculator::{
    implied_payout, plan_stakes, ArbitrageOpportunity, BetInstruction, ImpliedBounds, StakePlan,
};
pub use detector::{check_market, evaluate_quotes};
pub use extractor::{extract_quotes, resolve_bookmakers, OutcomeQuote};
pub use fraction::FractionalOdds;
