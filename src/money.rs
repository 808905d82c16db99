//! Monetary primitives for the Payroll Engine.
//!
//! All money is carried as integer paise (1/100 of a rupee) in the [`Paise`]
//! newtype. Statutory rates are [`Decimal`] percentages, and every product of
//! an amount and a rate is rounded back to whole paise with "round half away
//! from zero" at the step that produced it. Filings require each line to be
//! independently rounded, so totals are always sums of rounded values.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in paise.
///
/// # Example
///
/// ```
/// use payroll_engine::money::Paise;
/// use rust_decimal::Decimal;
///
/// let basic = Paise::from_rupees(12_000);
/// assert_eq!(basic.value(), 1_200_000);
/// assert_eq!(basic.percent(Decimal::new(12, 0)), Paise::new(144_000));
/// assert_eq!(basic.to_rupees_string(), "12000.00");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Paise(i64);

impl Paise {
    /// Zero paise.
    pub const ZERO: Paise = Paise(0);

    /// Creates an amount from a raw paise value.
    pub const fn new(paise: i64) -> Self {
        Paise(paise)
    }

    /// Creates an amount from whole rupees.
    pub const fn from_rupees(rupees: i64) -> Self {
        Paise(rupees * 100)
    }

    /// Returns the raw paise value.
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true if the amount is exactly zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is below zero.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns the amount as a decimal number of paise.
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Converts a decimal number of paise to whole paise, rounding half away
    /// from zero.
    ///
    /// Values outside the `i64` range saturate.
    pub fn from_decimal(paise: Decimal) -> Self {
        let rounded = round_half_away(paise);
        let value = rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        Paise(value)
    }

    /// Applies a percentage rate and rounds the result to whole paise.
    ///
    /// `rate_percent` is expressed in percent, so `12` means 12%.
    pub fn percent(self, rate_percent: Decimal) -> Self {
        Self::from_decimal(self.to_decimal() * rate_percent / Decimal::ONE_HUNDRED)
    }

    /// Scales the amount by `numerator / denominator` and rounds to whole paise.
    ///
    /// A non-positive denominator yields zero.
    pub fn prorate(self, numerator: Decimal, denominator: Decimal) -> Self {
        if denominator <= Decimal::ZERO {
            return Paise::ZERO;
        }
        Self::from_decimal(self.to_decimal() * numerator / denominator)
    }

    /// Divides the amount into `parts` equal shares, rounding the share.
    ///
    /// Zero parts yields zero.
    pub fn divide_rounded(self, parts: u32) -> Self {
        if parts == 0 {
            return Paise::ZERO;
        }
        Self::from_decimal(self.to_decimal() / Decimal::from(parts))
    }

    /// Returns the amount, or zero if it is negative.
    pub fn floor_zero(self) -> Self {
        Paise(self.0.max(0))
    }

    /// Renders the amount in rupees with exactly two decimals, e.g. `"1500.05"`.
    pub fn to_rupees_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Rounds a decimal to zero decimal places, half away from zero.
pub fn round_half_away(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.to_rupees_string())
    }
}

impl Add for Paise {
    type Output = Paise;

    fn add(self, rhs: Paise) -> Paise {
        Paise(self.0 + rhs.0)
    }
}

impl AddAssign for Paise {
    fn add_assign(&mut self, rhs: Paise) {
        self.0 += rhs.0;
    }
}

impl Sub for Paise {
    type Output = Paise;

    fn sub(self, rhs: Paise) -> Paise {
        Paise(self.0 - rhs.0)
    }
}

impl SubAssign for Paise {
    fn sub_assign(&mut self, rhs: Paise) {
        self.0 -= rhs.0;
    }
}

impl Neg for Paise {
    type Output = Paise;

    fn neg(self) -> Paise {
        Paise(-self.0)
    }
}

impl Sum for Paise {
    fn sum<I: Iterator<Item = Paise>>(iter: I) -> Paise {
        iter.fold(Paise::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Paise> for Paise {
    fn sum<I: Iterator<Item = &'a Paise>>(iter: I) -> Paise {
        iter.copied().sum()
    }
}
