//! Reducing-balance loan amortization.
//!
//! Interest for a month is charged on the balance outstanding at its start,
//! and the fixed installment (EMI) pays that interest first and principal
//! with the rest. The final installment takes whatever principal is left, so
//! the schedule always closes at exactly zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::PayrollPeriod;
use crate::money::Paise;

/// One installment of an amortization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based installment number.
    pub installment_no: u32,
    /// The payroll month the installment falls in.
    pub period: PayrollPeriod,
    /// Amount recovered (principal + interest).
    pub emi: Paise,
    /// Interest portion.
    pub interest: Paise,
    /// Principal portion.
    pub principal: Paise,
    /// Outstanding principal before the installment.
    pub balance_before: Paise,
    /// Outstanding principal after the installment.
    pub balance_after: Paise,
}

/// Schedule totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTotals {
    /// Sum of interest over all installments.
    pub total_interest: Paise,
    /// Principal plus total interest.
    pub total_repayment: Paise,
}

fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / Decimal::from(12) / Decimal::ONE_HUNDRED
}

fn validate_terms(principal: Paise, annual_rate: Decimal, tenure_months: u32) -> EngineResult<()> {
    if !principal.is_positive() {
        return Err(EngineError::validation("principal", "must be positive"));
    }
    if annual_rate.is_sign_negative() {
        return Err(EngineError::validation("annual_rate", "must not be negative"));
    }
    if tenure_months == 0 {
        return Err(EngineError::validation("tenure_months", "must be at least 1"));
    }
    Ok(())
}

/// Computes the equated monthly installment.
///
/// Uses `P·r·(1+r)^n / ((1+r)^n − 1)` with `r` the monthly rate. A zero rate
/// divides the principal evenly with integer division; the remainder is left
/// for the final installment.
///
/// # Examples
///
/// ```
/// use payroll_engine::loans::compute_emi;
/// use payroll_engine::money::Paise;
/// use rust_decimal::Decimal;
///
/// let emi = compute_emi(Paise::from_rupees(120_000), Decimal::new(12, 0), 12).unwrap();
/// assert_eq!(emi, Paise::new(1_066_185));
/// ```
pub fn compute_emi(principal: Paise, annual_rate: Decimal, tenure_months: u32) -> EngineResult<Paise> {
    validate_terms(principal, annual_rate, tenure_months)?;

    let r = monthly_rate(annual_rate);
    if r.is_zero() {
        return Ok(Paise::new(principal.value() / i64::from(tenure_months)));
    }

    let growth = Decimal::ONE + r;
    let mut compounded = Decimal::ONE;
    for _ in 0..tenure_months {
        compounded = compounded.checked_mul(growth).ok_or_else(|| {
            EngineError::validation("tenure_months", "rate and tenure overflow the EMI formula")
        })?;
    }

    let emi = principal.to_decimal() * r * compounded / (compounded - Decimal::ONE);
    Ok(Paise::from_decimal(emi))
}

/// Generates the full amortization schedule starting at `start`.
///
/// Invariants: the last row's `balance_after` is zero and the principal
/// portions sum exactly to `principal`.
pub fn generate_schedule(
    principal: Paise,
    annual_rate: Decimal,
    tenure_months: u32,
    start: PayrollPeriod,
) -> EngineResult<Vec<ScheduleRow>> {
    let emi = compute_emi(principal, annual_rate, tenure_months)?;
    let r = monthly_rate(annual_rate);

    let mut rows = Vec::with_capacity(tenure_months as usize);
    let mut balance = principal;
    let mut period = start;

    for installment_no in 1..=tenure_months {
        let interest = Paise::from_decimal(balance.to_decimal() * r);
        let principal_part = if installment_no == tenure_months {
            balance
        } else {
            (emi - interest).min(balance).floor_zero()
        };
        let balance_after = balance - principal_part;

        rows.push(ScheduleRow {
            installment_no,
            period,
            emi: principal_part + interest,
            interest,
            principal: principal_part,
            balance_before: balance,
            balance_after,
        });

        balance = balance_after;
        period = period.next();
    }

    Ok(rows)
}

/// Sums a schedule's interest and repayment.
pub fn schedule_totals(principal: Paise, rows: &[ScheduleRow]) -> ScheduleTotals {
    let total_interest: Paise = rows.iter().map(|row| row.interest).sum();
    ScheduleTotals {
        total_interest,
        total_repayment: principal + total_interest,
    }
}
