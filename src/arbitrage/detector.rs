//! Arbitrage opportunity detection on market pages.

use std::time::Instant;

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::calculator::{
    implied_payout, plan_stakes, round_cents, ArbitrageOpportunity, BetInstruction, ImpliedBounds,
};
use super::extractor::{extract_quotes, resolve_bookmakers, OutcomeQuote};
use super::fraction::FractionalOdds;
use crate::config::Config;
use crate::error::ParseError;
use crate::metrics;
use crate::page::Page;

/// Check one market page for an arbitrage opportunity.
///
/// `Ok(None)` is the normal negative result. A malformed odds table is a
/// [`ParseError`] and the caller skips the page.
#[instrument(skip(page, config), fields(market = %page.name))]
pub fn check_market(
    page: &Page,
    config: &Config,
) -> Result<Option<ArbitrageOpportunity>, ParseError> {
    let start = Instant::now();
    let quotes = extract_quotes(page).inspect_err(|_| metrics::inc_parse_failures())?;
    let opportunity = evaluate_quotes(page, quotes, config);
    metrics::record_evaluation_latency(start);
    metrics::inc_markets_evaluated();
    Ok(opportunity)
}

/// Evaluate extracted quotes, resolving bookmakers only for a hit.
pub fn evaluate_quotes(
    page: &Page,
    mut quotes: Vec<OutcomeQuote>,
    config: &Config,
) -> Option<ArbitrageOpportunity> {
    if quotes.len() < 2 {
        debug!(outcomes = quotes.len(), "Too few outcomes");
        return None;
    }

    if let Some(missing) = quotes.iter().find(|q| !q.has_price()) {
        debug!(selection = %missing.selection, "Outcome has no eligible price");
        return None;
    }

    let odds: Vec<Decimal> = quotes.iter().map(|q| q.best_odds).collect();
    let bounds = ImpliedBounds {
        min: config.min_implied,
        max: config.max_implied,
    };

    let Some(plan) = plan_stakes(&odds, config.bet_amount, bounds) else {
        debug!(
            implied = ?implied_payout(&odds),
            min = %bounds.min,
            max = %bounds.max,
            "No arbitrage opportunity"
        );
        return None;
    };

    resolve_bookmakers(page, &mut quotes);

    let instructions = quotes
        .into_iter()
        .zip(&plan.stakes)
        .map(|(quote, stake)| BetInstruction {
            stake: round_cents(*stake),
            fractional: FractionalOdds::from_decimal_odds(quote.best_odds),
            odds: quote.best_odds,
            selection: quote.selection,
            bookmaker: quote.bookmaker.unwrap_or_default(),
        })
        .collect();

    let opportunity = ArbitrageOpportunity {
        name: page.name.clone(),
        url: page.url.clone(),
        implied: plan.implied,
        stake: plan.total_stake,
        profit: round_cents(plan.profit),
        instructions,
        detected_at: OffsetDateTime::now_utc(),
    };

    info!(
        implied = %opportunity.implied.round_dp(4),
        profit = %opportunity.profit,
        "Arbitrage opportunity detected"
    );
    metrics::inc_opportunities_detected();

    Some(opportunity)
}
