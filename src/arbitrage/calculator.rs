//! Implied payout, stake allocation and opportunity records.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::fraction::FractionalOdds;

/// Separator between the game and market parts of an opportunity name.
pub const NAME_SEPARATOR: &str = ": ";

/// Acceptance window for the implied payout multiple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpliedBounds {
    /// Exclusive lower bound; values at or below are noise.
    pub min: Decimal,
    /// Exclusive upper bound; values at or above are treated as bad data.
    pub max: Decimal,
}

impl ImpliedBounds {
    /// Whether `implied` lies strictly inside the window.
    pub fn contains(&self, implied: Decimal) -> bool {
        self.min < implied && implied < self.max
    }
}

/// Implied payout multiple `1 / Σ(1/odds)`.
///
/// Returns `None` for fewer than two outcomes or any odds at or below zero.
/// A value above 1 means backing every outcome returns more than the stake.
pub fn implied_payout(odds: &[Decimal]) -> Option<Decimal> {
    if odds.len() < 2 || odds.iter().any(|o| *o <= Decimal::ZERO) {
        return None;
    }

    let inverse_sum = odds
        .iter()
        .try_fold(Decimal::ZERO, |acc, o| acc.checked_add(Decimal::ONE.checked_div(*o)?))?;
    Decimal::ONE.checked_div(inverse_sum)
}

/// Stake split that pays the same whichever outcome wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakePlan {
    /// Implied payout multiple.
    pub implied: Decimal,
    /// Total stake.
    pub total_stake: Decimal,
    /// Stake per outcome, in input order (`S * p / odds_i`).
    pub stakes: Vec<Decimal>,
    /// Payout whichever outcome wins (`S * p`).
    pub payout: Decimal,
    /// Net profit (`S * p - S`).
    pub profit: Decimal,
}

/// Allocate `total_stake` across outcomes when the implied payout is inside
/// `bounds`.
///
/// Returns `None` when the payout or any stake overflows `Decimal`.
pub fn plan_stakes(odds: &[Decimal], total_stake: Decimal, bounds: ImpliedBounds) -> Option<StakePlan> {
    let implied = implied_payout(odds)?;
    if !bounds.contains(implied) {
        return None;
    }

    let payout = total_stake.checked_mul(implied)?;
    let stakes = odds
        .iter()
        .map(|o| payout.checked_div(*o))
        .collect::<Option<Vec<_>>>()?;

    Some(StakePlan {
        implied,
        total_stake,
        stakes,
        payout,
        profit: payout.checked_sub(total_stake)?,
    })
}

/// One leg of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetInstruction {
    /// Stake on this outcome, rounded to cents.
    pub stake: Decimal,
    /// Selection name.
    pub selection: String,
    /// Bookmaker offering the price; empty when unknown.
    pub bookmaker: String,
    /// Decimal odds taken.
    pub odds: Decimal,
    /// Fractional form of `odds`.
    pub fractional: FractionalOdds,
}

impl fmt::Display for BetInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BET {} on selection {} on website {} at odds {}.",
            self.stake, self.selection, self.bookmaker, self.fractional
        )
    }
}

/// Detected arbitrage opportunity on one market page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    /// `game: market` name.
    pub name: String,
    /// Market page URL.
    pub url: String,
    /// Implied payout multiple.
    pub implied: Decimal,
    /// Total stake the instructions split.
    pub stake: Decimal,
    /// Net profit for `stake`, rounded to cents.
    pub profit: Decimal,
    /// One instruction per outcome, in table order.
    pub instructions: Vec<BetInstruction>,
    /// When the opportunity was detected.
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
}

impl ArbitrageOpportunity {
    /// Game part of the name.
    pub fn game(&self) -> &str {
        self.name
            .split_once(NAME_SEPARATOR)
            .map_or(self.name.as_str(), |(game, _)| game)
    }

    /// Market part of the name (empty when the name has no separator).
    pub fn market(&self) -> &str {
        self.name
            .split_once(NAME_SEPARATOR)
            .map_or("", |(_, market)| market)
    }

    /// Profit as a percentage of the stake.
    pub fn roi(&self) -> Decimal {
        if self.stake.is_zero() {
            Decimal::ZERO
        } else {
            (self.profit / self.stake) * Decimal::ONE_HUNDRED
        }
    }
}

/// Round money to cents.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}
