//! Fractional odds display.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest denominator used when displaying fractional odds.
pub const MAX_DENOMINATOR: u128 = 1000;

/// Odds as a reduced `profit/stake` fraction, e.g. `11/10` for decimal 2.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionalOdds {
    /// Profit part.
    pub numerator: u64,
    /// Stake part.
    pub denominator: u64,
}

impl FractionalOdds {
    /// Fractional form of decimal odds, i.e. the closest fraction to
    /// `odds - 1` whose denominator does not exceed [`MAX_DENOMINATOR`].
    ///
    /// Odds at or below 1 (no profit) give `0/1`.
    pub fn from_decimal_odds(odds: Decimal) -> Self {
        Self::approximate(odds - Decimal::ONE, MAX_DENOMINATOR)
    }

    /// Best rational approximation of a non-negative value with a bounded
    /// denominator. Negative values clamp to zero.
    pub fn approximate(value: Decimal, max_denominator: u128) -> Self {
        if value <= Decimal::ZERO || max_denominator == 0 {
            return Self::new(0, 1);
        }

        let (num, den) = to_ratio(value);
        if den <= max_denominator {
            return Self::new(num, den);
        }

        // Continued fraction expansion until the next convergent's
        // denominator would exceed the bound.
        let (mut p0, mut q0, mut p1, mut q1) = (0u128, 1u128, 1u128, 0u128);
        let (mut n, mut d) = (num, den);
        loop {
            let a = n / d;
            let q2 = q0 + a * q1;
            if q2 > max_denominator {
                break;
            }
            (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
            (n, d) = (d, n - a * d);
        }

        // Choose between the last convergent and the best semiconvergent.
        let k = (max_denominator - q0) / q1;
        let semi = (p0 + k * p1, q0 + k * q1);
        if 2 * d * (q0 + k * q1) <= den {
            Self::new(p1, q1)
        } else {
            Self::new(semi.0, semi.1)
        }
    }

    /// Reduce and narrow to `u64`, saturating parts that do not fit.
    fn new(numerator: u128, denominator: u128) -> Self {
        let g = gcd(numerator, denominator).max(1);
        Self {
            numerator: u64::try_from(numerator / g).unwrap_or(u64::MAX),
            denominator: u64::try_from(denominator / g).unwrap_or(u64::MAX),
        }
    }
}

impl fmt::Display for FractionalOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Exact reduced ratio of a positive decimal.
fn to_ratio(value: Decimal) -> (u128, u128) {
    let num = value.mantissa().unsigned_abs();
    let den = 10u128.pow(value.scale());
    let g = gcd(num, den);
    (num / g, den / g)
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
