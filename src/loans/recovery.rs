//! Loan recovery against a month's pay.
//!
//! Installments due in the month are considered one loan at a time, oldest
//! loan first. Each is either deducted or skipped according to the
//! configured [`InsufficientNetPayPolicy`], with net pay shrinking as earlier
//! installments are taken.

use crate::config::InsufficientNetPayPolicy;
use crate::error::EngineResult;
use crate::models::{
    AppliedLoanDeduction, AuditStep, EmployeeLoan, LoanDeduction, LoanDeductionStatus,
    LoanDeductionUpdate,
};
use crate::money::Paise;

use super::lifecycle::{apply_deduction, skip_deduction};

/// The outcome of recovering a month's installments.
#[derive(Debug, Clone, Default)]
pub struct RecoveryPlan {
    /// Each installment and how it was handled.
    pub applied: Vec<AppliedLoanDeduction>,
    /// Updates to commit with the payroll record.
    pub updates: Vec<LoanDeductionUpdate>,
    /// Sum of deducted installments.
    pub recovered: Paise,
    /// One audit step per installment considered.
    pub audit_steps: Vec<AuditStep>,
}

/// Returns true if the policy lets `installment` be taken from `net_pay`.
pub fn can_deduct(
    policy: &InsufficientNetPayPolicy,
    gross: Paise,
    net_pay: Paise,
    installment: Paise,
) -> bool {
    let after = net_pay - installment;
    match policy {
        InsufficientNetPayPolicy::AlwaysDeduct => true,
        InsufficientNetPayPolicy::MinimumNetPay { amount } => after >= *amount,
        InsufficientNetPayPolicy::MinimumNetPayPercentOfGross { percent } => {
            after >= gross.percent(*percent)
        }
    }
}

/// Decides every installment due this month.
///
/// `net_before_loans` is gross less statutory deductions. Installments
/// already deducted for this period are kept as they are; scheduled and
/// skipped ones are decided afresh.
pub fn plan_recovery(
    policy: &InsufficientNetPayPolicy,
    gross: Paise,
    net_before_loans: Paise,
    mut installments: Vec<(EmployeeLoan, LoanDeduction)>,
    run_id: &str,
) -> EngineResult<RecoveryPlan> {
    installments.sort_by(|(a, _), (b, _)| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut plan = RecoveryPlan::default();
    let mut net_pay = net_before_loans;

    for (loan, deduction) in installments {
        if deduction.status == LoanDeductionStatus::Deducted {
            net_pay -= deduction.amount;
            plan.recovered += deduction.amount;
            plan.applied.push(applied(&deduction, LoanDeductionStatus::Deducted));
            plan.audit_steps.push(step(
                &loan,
                &deduction,
                format!("Installment {} already recovered", deduction.installment_no),
            ));
            continue;
        }

        if can_deduct(policy, gross, net_pay, deduction.amount) {
            plan.updates.push(apply_deduction(&loan, &deduction, run_id)?);
            net_pay -= deduction.amount;
            plan.recovered += deduction.amount;
            plan.applied.push(applied(&deduction, LoanDeductionStatus::Deducted));
            plan.audit_steps.push(step(
                &loan,
                &deduction,
                format!(
                    "Installment {} of {} deducted; net pay now {}",
                    deduction.installment_no, deduction.amount, net_pay
                ),
            ));
        } else {
            plan.updates.push(skip_deduction(&loan, &deduction, run_id)?);
            plan.applied.push(applied(&deduction, LoanDeductionStatus::Skipped));
            plan.audit_steps.push(step(
                &loan,
                &deduction,
                format!(
                    "Installment {} of {} skipped: net pay {} insufficient under {:?}",
                    deduction.installment_no, deduction.amount, net_pay, policy
                ),
            ));
        }
    }

    Ok(plan)
}

fn applied(deduction: &LoanDeduction, status: LoanDeductionStatus) -> AppliedLoanDeduction {
    AppliedLoanDeduction {
        loan_id: deduction.loan_id.clone(),
        installment_no: deduction.installment_no,
        amount: deduction.amount,
        principal: deduction.principal,
        status,
    }
}

fn step(loan: &EmployeeLoan, deduction: &LoanDeduction, reasoning: String) -> AuditStep {
    AuditStep::new(
        "loan_recovery",
        "Loan Recovery",
        format!("Loan {} installment {}", loan.id, deduction.installment_no),
        reasoning,
    )
}
