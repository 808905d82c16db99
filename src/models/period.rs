//! Payroll period and financial-year model.
//!
//! This module contains the [`PayrollPeriod`] type: a calendar month that
//! payroll is run for, with the Indian financial-year arithmetic the
//! statutory calculators need. The financial year runs April to March, so
//! April is FY month 1 and March is FY month 12.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A payroll month.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayrollPeriod;
///
/// let period = PayrollPeriod::new(6, 2025).unwrap();
/// assert_eq!(period.fy_month(), 3);
/// assert_eq!(period.remaining_fy_months(), 10);
/// assert_eq!(period.fy_label(), "2025-26");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// The calendar year.
    pub year: i32,
    /// The calendar month (1-12).
    pub month: u32,
}

impl PayrollPeriod {
    /// Creates a period, validating the month and year.
    pub fn new(month: u32, year: i32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) || !(1900..=9999).contains(&year) {
            return Err(EngineError::InvalidPeriod { month, year });
        }
        Ok(Self { year, month })
    }

    /// Returns the period containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Returns the last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// Returns the number of calendar days in the month.
    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    /// Returns the date with the given day of this month, clamped to the
    /// month's last day.
    pub fn day_clamped(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.days_in_month());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_else(|| self.last_day())
    }

    /// Returns the following month.
    pub fn next(&self) -> Self {
        self.plus_months(1)
    }

    /// Returns the month `months` after this one.
    pub fn plus_months(&self, months: u32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months as i32;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Returns the financial-year month number (April = 1, March = 12).
    pub fn fy_month(&self) -> u32 {
        if self.month >= 4 {
            self.month - 3
        } else {
            self.month + 9
        }
    }

    /// Returns the calendar year in which this period's financial year starts.
    pub fn fy_start_year(&self) -> i32 {
        if self.month >= 4 {
            self.year
        } else {
            self.year - 1
        }
    }

    /// Returns the number of financial-year months from this one to March,
    /// inclusive of this month.
    pub fn remaining_fy_months(&self) -> u32 {
        12 - self.fy_month() + 1
    }

    /// Returns true if this month closes a financial-year quarter
    /// (June, September, December or March).
    pub fn is_fy_quarter_end(&self) -> bool {
        self.fy_month() % 3 == 0
    }

    /// Returns the financial-year label, e.g. `"2025-26"`.
    pub fn fy_label(&self) -> String {
        let start = self.fy_start_year();
        format!("{}-{:02}", start, (start + 1).rem_euclid(100))
    }
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}
