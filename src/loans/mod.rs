//! Employee loans: amortization, lifecycle and recovery through payroll.
//!
//! A loan's full deduction ledger is generated once, at creation, from a
//! reducing-balance schedule. Payroll then recovers one installment a month
//! as long as the configured net-pay policy allows it.

mod amortization;
mod lifecycle;
mod recovery;

pub use amortization::{ScheduleRow, ScheduleTotals, compute_emi, generate_schedule, schedule_totals};
pub use lifecycle::{
    NewLoan, activate, apply_deduction, apply_update, cancel, create_loan, mark_defaulted,
    revert_deduction, skip_deduction,
};
pub use recovery::{RecoveryPlan, can_deduct, plan_recovery};
