//! Employee loan and loan deduction models.
//!
//! A loan owns its deduction ledger: one [`LoanDeduction`] per month of the
//! tenure, generated when the loan is created and never regenerated. A change
//! of rate or principal requires a new loan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Paise;

use super::PayrollPeriod;

/// Loan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Created, awaiting approval.
    Pending,
    /// Being repaid through payroll.
    Active,
    /// Fully repaid.
    Closed,
    /// Withdrawn before or during repayment.
    Cancelled,
    /// Written off as unrecoverable.
    Defaulted,
}

impl LoanStatus {
    /// Returns the status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Closed => "closed",
            LoanStatus::Cancelled => "cancelled",
            LoanStatus::Defaulted => "defaulted",
        }
    }

    /// Returns true if the lifecycle allows moving from `self` to `to`.
    ///
    /// `Closed -> Active` is only used when a payroll run is reverted and the
    /// final installment is handed back.
    pub fn can_transition_to(&self, to: LoanStatus) -> bool {
        matches!(
            (self, to),
            (LoanStatus::Pending, LoanStatus::Active)
                | (LoanStatus::Pending, LoanStatus::Cancelled)
                | (LoanStatus::Active, LoanStatus::Closed)
                | (LoanStatus::Active, LoanStatus::Cancelled)
                | (LoanStatus::Active, LoanStatus::Defaulted)
                | (LoanStatus::Closed, LoanStatus::Active)
        )
    }
}

/// A loan or salary advance repaid through payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeLoan {
    /// Unique identifier for the loan.
    pub id: String,
    /// The borrowing employee.
    pub employee_id: String,
    /// Amount lent.
    pub principal: Paise,
    /// Annual interest rate in percent.
    pub annual_rate: Decimal,
    /// Number of monthly installments.
    pub tenure_months: u32,
    /// Equated monthly installment.
    pub emi: Paise,
    /// Interest over the whole schedule.
    pub total_interest: Paise,
    /// Principal plus total interest.
    pub total_repayment: Paise,
    /// Principal still outstanding.
    pub remaining_balance: Paise,
    /// The month of the first installment.
    pub start_period: PayrollPeriod,
    /// Lifecycle status.
    pub status: LoanStatus,
    /// When the loan was created.
    pub created_at: DateTime<Utc>,
}

/// Status of a scheduled loan installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanDeductionStatus {
    /// Not yet processed by payroll.
    Scheduled,
    /// Recovered from pay.
    Deducted,
    /// Not recovered because net pay was insufficient.
    Skipped,
}

/// One month of a loan's amortization ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDeduction {
    /// The loan this installment belongs to.
    pub loan_id: String,
    /// The borrowing employee.
    pub employee_id: String,
    /// The payroll month the installment is due in.
    pub period: PayrollPeriod,
    /// 1-based installment number.
    pub installment_no: u32,
    /// Installment amount (principal + interest).
    pub amount: Paise,
    /// Principal portion.
    pub principal: Paise,
    /// Interest portion.
    pub interest: Paise,
    /// Outstanding principal after this installment.
    pub balance_after: Paise,
    /// Processing status.
    pub status: LoanDeductionStatus,
    /// The payroll run that processed the installment.
    #[serde(default)]
    pub run_id: Option<String>,
}

/// A change to one installment and its loan, committed together with the
/// payroll record that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDeductionUpdate {
    /// The loan.
    pub loan_id: String,
    /// The installment month.
    pub period: PayrollPeriod,
    /// New installment status.
    pub deduction_status: LoanDeductionStatus,
    /// The run responsible, cleared on revert.
    pub run_id: Option<String>,
    /// Loan balance after the change.
    pub remaining_balance: Paise,
    /// Loan status after the change.
    pub loan_status: LoanStatus,
}
