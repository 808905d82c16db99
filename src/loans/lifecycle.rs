//! Loan lifecycle and installment bookkeeping.
//!
//! Installment changes are computed as [`LoanDeductionUpdate`] values rather
//! than applied in place, so the orchestrator can commit them in the same
//! storage call as the payroll record that caused them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    EmployeeLoan, LoanDeduction, LoanDeductionStatus, LoanDeductionUpdate, LoanStatus,
    PayrollPeriod,
};
use crate::money::Paise;

use super::amortization::{generate_schedule, schedule_totals};

/// A request to lend money to an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
    /// The borrowing employee.
    pub employee_id: String,
    /// Amount lent.
    pub principal: Paise,
    /// Annual interest rate in percent.
    pub annual_rate: Decimal,
    /// Number of monthly installments.
    pub tenure_months: u32,
    /// The month of the first installment.
    pub start_period: PayrollPeriod,
}

/// Creates a pending loan and its full deduction ledger.
pub fn create_loan(
    request: NewLoan,
    now: DateTime<Utc>,
) -> EngineResult<(EmployeeLoan, Vec<LoanDeduction>)> {
    if request.employee_id.trim().is_empty() {
        return Err(EngineError::validation("employee_id", "must not be empty"));
    }

    let rows = generate_schedule(
        request.principal,
        request.annual_rate,
        request.tenure_months,
        request.start_period,
    )?;
    let totals = schedule_totals(request.principal, &rows);
    let emi = rows.first().map(|row| row.emi).unwrap_or_default();

    let loan = EmployeeLoan {
        id: Uuid::new_v4().to_string(),
        employee_id: request.employee_id,
        principal: request.principal,
        annual_rate: request.annual_rate,
        tenure_months: request.tenure_months,
        emi,
        total_interest: totals.total_interest,
        total_repayment: totals.total_repayment,
        remaining_balance: request.principal,
        start_period: request.start_period,
        status: LoanStatus::Pending,
        created_at: now,
    };

    let deductions = rows
        .into_iter()
        .map(|row| LoanDeduction {
            loan_id: loan.id.clone(),
            employee_id: loan.employee_id.clone(),
            period: row.period,
            installment_no: row.installment_no,
            amount: row.emi,
            principal: row.principal,
            interest: row.interest,
            balance_after: row.balance_after,
            status: LoanDeductionStatus::Scheduled,
            run_id: None,
        })
        .collect();

    Ok((loan, deductions))
}

fn transition(loan: &mut EmployeeLoan, to: LoanStatus) -> EngineResult<()> {
    if !loan.status.can_transition_to(to) {
        return Err(EngineError::InvalidTransition {
            entity: "loan",
            from: loan.status.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    loan.status = to;
    Ok(())
}

/// Approves a pending loan so payroll starts recovering it.
pub fn activate(loan: &mut EmployeeLoan) -> EngineResult<()> {
    transition(loan, LoanStatus::Active)
}

/// Cancels a pending or active loan.
pub fn cancel(loan: &mut EmployeeLoan) -> EngineResult<()> {
    transition(loan, LoanStatus::Cancelled)
}

/// Writes off an active loan.
pub fn mark_defaulted(loan: &mut EmployeeLoan) -> EngineResult<()> {
    transition(loan, LoanStatus::Defaulted)
}

fn deduction_transition_error(deduction: &LoanDeduction, to: &str) -> EngineError {
    EngineError::InvalidTransition {
        entity: "loan_deduction",
        from: format!("{:?}", deduction.status).to_lowercase(),
        to: to.to_string(),
    }
}

/// Recovers an installment: the loan balance drops by its principal and the
/// loan closes when nothing is left.
///
/// A previously skipped installment may be recovered when its record is
/// recomputed.
pub fn apply_deduction(
    loan: &EmployeeLoan,
    deduction: &LoanDeduction,
    run_id: &str,
) -> EngineResult<LoanDeductionUpdate> {
    if loan.status != LoanStatus::Active {
        return Err(EngineError::InvalidTransition {
            entity: "loan",
            from: loan.status.as_str().to_string(),
            to: "deducted".to_string(),
        });
    }
    if deduction.status == LoanDeductionStatus::Deducted {
        return Err(deduction_transition_error(deduction, "deducted"));
    }

    let remaining_balance = (loan.remaining_balance - deduction.principal).floor_zero();
    let loan_status = if remaining_balance.is_zero() {
        LoanStatus::Closed
    } else {
        loan.status
    };

    Ok(LoanDeductionUpdate {
        loan_id: loan.id.clone(),
        period: deduction.period,
        deduction_status: LoanDeductionStatus::Deducted,
        run_id: Some(run_id.to_string()),
        remaining_balance,
        loan_status,
    })
}

/// Marks an installment as not recovered this month. The balance is unchanged.
pub fn skip_deduction(
    loan: &EmployeeLoan,
    deduction: &LoanDeduction,
    run_id: &str,
) -> EngineResult<LoanDeductionUpdate> {
    if deduction.status == LoanDeductionStatus::Deducted {
        return Err(deduction_transition_error(deduction, "skipped"));
    }

    Ok(LoanDeductionUpdate {
        loan_id: loan.id.clone(),
        period: deduction.period,
        deduction_status: LoanDeductionStatus::Skipped,
        run_id: Some(run_id.to_string()),
        remaining_balance: loan.remaining_balance,
        loan_status: loan.status,
    })
}

/// Returns a processed installment to `Scheduled`, handing back its
/// principal if it was recovered. A loan closed by the installment reopens.
pub fn revert_deduction(
    loan: &EmployeeLoan,
    deduction: &LoanDeduction,
) -> EngineResult<LoanDeductionUpdate> {
    let (remaining_balance, loan_status) = match deduction.status {
        LoanDeductionStatus::Deducted => {
            let status = if loan.status == LoanStatus::Closed {
                LoanStatus::Active
            } else {
                loan.status
            };
            (loan.remaining_balance + deduction.principal, status)
        }
        LoanDeductionStatus::Skipped => (loan.remaining_balance, loan.status),
        LoanDeductionStatus::Scheduled => {
            return Err(deduction_transition_error(deduction, "scheduled"));
        }
    };

    Ok(LoanDeductionUpdate {
        loan_id: loan.id.clone(),
        period: deduction.period,
        deduction_status: LoanDeductionStatus::Scheduled,
        run_id: None,
        remaining_balance,
        loan_status,
    })
}

/// Writes an update into a loan and its installment.
///
/// Storage adapters call this inside their atomic commit.
pub fn apply_update(
    update: &LoanDeductionUpdate,
    loan: &mut EmployeeLoan,
    deduction: &mut LoanDeduction,
) {
    loan.remaining_balance = update.remaining_balance;
    loan.status = update.loan_status;
    deduction.status = update.deduction_status;
    deduction.run_id = update.run_id.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request() -> NewLoan {
        NewLoan {
            employee_id: "emp_001".to_string(),
            principal: Paise::from_rupees(120_000),
            annual_rate: Decimal::from_str("12").unwrap(),
            tenure_months: 12,
            start_period: PayrollPeriod::new(4, 2025).unwrap(),
        }
    }

    fn active_loan() -> (EmployeeLoan, Vec<LoanDeduction>) {
        let (mut loan, deductions) = create_loan(request(), Utc::now()).unwrap();
        activate(&mut loan).unwrap();
        (loan, deductions)
    }

    #[test]
    fn test_create_loan_pregenerates_ledger() {
        let (loan, deductions) = create_loan(request(), Utc::now()).unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.emi, Paise::new(1_066_185));
        assert_eq!(loan.total_interest, Paise::new(794_226));
        assert_eq!(loan.remaining_balance, loan.principal);
        assert_eq!(deductions.len(), 12);
        assert!(deductions.iter().all(|d| d.loan_id == loan.id));
        assert!(deductions.iter().all(|d| d.status == LoanDeductionStatus::Scheduled));
        assert_eq!(deductions[11].period, PayrollPeriod::new(3, 2026).unwrap());
    }

    #[test]
    fn test_create_loan_rejects_blank_employee() {
        let mut bad = request();
        bad.employee_id = " ".to_string();
        assert!(create_loan(bad, Utc::now()).is_err());
    }

    #[test]
    fn test_lifecycle_guards() {
        let (mut loan, _) = create_loan(request(), Utc::now()).unwrap();
        assert!(mark_defaulted(&mut loan).is_err());
        activate(&mut loan).unwrap();
        mark_defaulted(&mut loan).unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);
        assert!(matches!(
            cancel(&mut loan),
            Err(EngineError::InvalidTransition { entity: "loan", .. })
        ));
    }

    #[test]
    fn test_apply_reduces_balance() {
        let (loan, deductions) = active_loan();
        let update = apply_deduction(&loan, &deductions[0], "run-1").unwrap();

        assert_eq!(update.deduction_status, LoanDeductionStatus::Deducted);
        assert_eq!(update.remaining_balance, deductions[0].balance_after);
        assert_eq!(update.loan_status, LoanStatus::Active);
        assert_eq!(update.run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_final_installment_closes_loan() {
        let (mut loan, mut deductions) = active_loan();
        for deduction in deductions.iter_mut() {
            let update = apply_deduction(&loan, deduction, "run").unwrap();
            apply_update(&update, &mut loan, deduction);
        }
        assert_eq!(loan.remaining_balance, Paise::ZERO);
        assert_eq!(loan.status, LoanStatus::Closed);
    }

    #[test]
    fn test_pending_loan_cannot_be_deducted() {
        let (loan, deductions) = create_loan(request(), Utc::now()).unwrap();
        assert!(apply_deduction(&loan, &deductions[0], "run-1").is_err());
    }

    #[test]
    fn test_deducted_installment_cannot_be_applied_twice() {
        let (mut loan, mut deductions) = active_loan();
        let update = apply_deduction(&loan, &deductions[0], "run-1").unwrap();
        apply_update(&update, &mut loan, &mut deductions[0]);
        assert!(apply_deduction(&loan, &deductions[0], "run-1").is_err());
        assert!(skip_deduction(&loan, &deductions[0], "run-1").is_err());
    }

    #[test]
    fn test_skip_keeps_balance_and_can_be_recovered_later() {
        let (mut loan, mut deductions) = active_loan();
        let update = skip_deduction(&loan, &deductions[0], "run-1").unwrap();
        apply_update(&update, &mut loan, &mut deductions[0]);

        assert_eq!(deductions[0].status, LoanDeductionStatus::Skipped);
        assert_eq!(loan.remaining_balance, loan.principal);
        assert!(apply_deduction(&loan, &deductions[0], "run-1").is_ok());
    }

    /// Skipped installments are not moved to the end of the schedule.
    #[test]
    fn test_skipped_installment_leaves_balance_after_last_month() {
        let (mut loan, mut deductions) = active_loan();
        let update = skip_deduction(&loan, &deductions[0], "run-1").unwrap();
        apply_update(&update, &mut loan, &mut deductions[0]);
        for deduction in deductions.iter_mut().skip(1) {
            let update = apply_deduction(&loan, deduction, "run").unwrap();
            apply_update(&update, &mut loan, deduction);
        }

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.remaining_balance, deductions[0].principal);
        assert!(deductions.iter().all(|d| d.status != LoanDeductionStatus::Scheduled));
    }

    #[test]
    fn test_revert_reopens_closed_loan() {
        let (mut loan, mut deductions) = active_loan();
        for deduction in deductions.iter_mut() {
            let update = apply_deduction(&loan, deduction, "run").unwrap();
            apply_update(&update, &mut loan, deduction);
        }

        let last = deductions.len() - 1;
        let update = revert_deduction(&loan, &deductions[last]).unwrap();
        apply_update(&update, &mut loan, &mut deductions[last]);

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.remaining_balance, deductions[last].principal);
        assert_eq!(deductions[last].status, LoanDeductionStatus::Scheduled);
        assert!(deductions[last].run_id.is_none());
    }

    #[test]
    fn test_revert_scheduled_installment_rejected() {
        let (loan, deductions) = active_loan();
        assert!(matches!(
            revert_deduction(&loan, &deductions[0]),
            Err(EngineError::InvalidTransition { entity: "loan_deduction", .. })
        ));
    }
}
