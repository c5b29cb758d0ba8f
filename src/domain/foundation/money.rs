//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Minor units per major unit (kopecks per rouble).
const MINOR_PER_MAJOR: i64 = 100;

/// A monetary amount stored as an integer number of minor units.
///
/// Floats never touch balances: webhook values such as `"255.00"` are parsed
/// digit by digit, and percentages are applied with integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount accepted from the outside: one billion roubles.
    pub const MAX_AMOUNT: Money = Money(1_000_000_000 * MINOR_PER_MAJOR);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn from_major(major: i64) -> Self {
        Self(major * MINOR_PER_MAJOR)
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a whole-number percentage, rounding half away from zero.
    ///
    /// Returns `None` if the result does not fit.
    pub fn checked_percent(&self, pct: i64) -> Option<Money> {
        let scaled = i128::from(self.0) * i128::from(pct);
        let half = 50 * scaled.signum();
        i64::try_from((scaled + half) / 100).ok().map(Money)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn negate(&self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses a non-negative decimal string with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::empty_field("amount"));
        }
        if s.starts_with('-') {
            return Err(ValidationError::negative("amount"));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::invalid_format("amount", "expected digits"));
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "amount",
                "at most two fractional digits allowed",
            ));
        }

        let major: i64 = whole
            .parse()
            .map_err(|_| ValidationError::out_of_range("amount", Money::MAX_AMOUNT))?;
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .map(Money)
            .filter(|m| *m <= Money::MAX_AMOUNT)
            .ok_or_else(|| ValidationError::out_of_range("amount", Money::MAX_AMOUNT))
    }
}
