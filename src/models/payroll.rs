//! Payroll run and payroll record models.
//!
//! A [`PayrollRun`] covers one month and owns one [`PayrollRecord`] per
//! employee. Runs move `Pending -> Processing -> Completed`, with `Failed`
//! reachable only from `Processing`. Records move `Calculated -> Verified ->
//! Paid`; a record is immutable once verified, and `Error` records hold the
//! cause of a per-employee failure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::{EsiContribution, ProvidentFundContribution};
use crate::error::{EngineError, EngineResult};
use crate::money::Paise;

use super::{AuditStep, LoanDeductionStatus, PayrollPeriod, SalaryComponents};

/// Status of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet started.
    Pending,
    /// Employees are being processed.
    Processing,
    /// Every employee reached a terminal state.
    Completed,
    /// Stopped by a run-level error or external cancellation.
    Failed,
}

impl RunStatus {
    /// Returns the status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Returns true if the run state machine allows moving from `self` to `to`.
    pub fn can_transition_to(&self, to: RunStatus) -> bool {
        matches!(
            (self, to),
            (RunStatus::Pending, RunStatus::Processing)
                | (RunStatus::Processing, RunStatus::Completed)
                | (RunStatus::Processing, RunStatus::Failed)
        )
    }
}

/// The stage a run is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Waiting to start.
    Queued,
    /// Reading the employee list.
    LoadingEmployees,
    /// Running per-employee units.
    CalculatingEmployees,
    /// Summing records into run totals.
    Aggregating,
    /// Nothing left to do.
    Finalized,
}

/// Progress counters reported for every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Employees in scope.
    pub total: u32,
    /// Employees whose unit finished, successfully or not.
    pub processed: u32,
    /// Employees with a calculated record.
    pub success: u32,
    /// Employees with an error record.
    pub error: u32,
}

/// Money totals across a run's successful records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Total gross earnings.
    pub gross: Paise,
    /// Total deductions.
    pub deductions: Paise,
    /// Total net pay.
    pub net_pay: Paise,
    /// Employee PF contributions.
    pub pf_employee: Paise,
    /// Employer PF contributions (EPF + EPS + EDLI + admin).
    pub pf_employer: Paise,
    /// Employee ESI contributions.
    pub esi_employee: Paise,
    /// Employer ESI contributions.
    pub esi_employer: Paise,
    /// Professional tax.
    pub professional_tax: Paise,
    /// Income tax withheld.
    pub tds: Paise,
    /// Loan installments recovered.
    pub loan_recovery: Paise,
}

impl RunTotals {
    /// Adds a record's amounts. Error records are ignored.
    pub fn add(&mut self, record: &PayrollRecord) {
        if record.status == RecordStatus::Error {
            return;
        }
        self.gross += record.gross_earnings;
        self.deductions += record.total_deductions;
        self.net_pay += record.net_pay;
        self.pf_employee += record.provident_fund.employee;
        self.pf_employer += record.provident_fund.employer_total();
        self.esi_employee += record.esi.employee;
        self.esi_employer += record.esi.employer;
        self.professional_tax += record.professional_tax;
        self.tds += record.tds;
        self.loan_recovery += record.loan_recovery;
    }
}

/// A payroll run for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique identifier for the run.
    pub id: String,
    /// The month being paid.
    pub period: PayrollPeriod,
    /// Run status.
    pub status: RunStatus,
    /// Current stage marker.
    pub stage: RunStage,
    /// Progress counters.
    pub counters: RunCounters,
    /// Money totals.
    pub totals: RunTotals,
    /// Set when the run has been reverted; a reverted run no longer blocks
    /// a new run for its period.
    pub reverted: bool,
    /// Why the run failed, if it did.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When processing finished.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PayrollRun {
    /// Creates a pending run for the period.
    pub fn new(period: PayrollPeriod, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            period,
            status: RunStatus::Pending,
            stage: RunStage::Queued,
            counters: RunCounters::default(),
            totals: RunTotals::default(),
            reverted: false,
            failure_reason: None,
            created_at: now,
            completed_at: None,
        }
    }

    /// Returns true if this run still counts against its period.
    pub fn blocks_period(&self) -> bool {
        !self.reverted
    }
}

/// A run's outcome as reported to callers and notifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The run.
    pub run_id: String,
    /// The month paid.
    pub period: PayrollPeriod,
    /// Run status.
    pub status: RunStatus,
    /// Current stage marker.
    pub stage: RunStage,
    /// Progress counters.
    pub counters: RunCounters,
    /// Money totals.
    pub totals: RunTotals,
    /// Whether the run has been reverted.
    pub reverted: bool,
    /// Why the run failed, if it did.
    pub failure_reason: Option<String>,
}

impl From<&PayrollRun> for RunSummary {
    fn from(run: &PayrollRun) -> Self {
        Self {
            run_id: run.id.clone(),
            period: run.period,
            status: run.status,
            stage: run.stage,
            counters: run.counters,
            totals: run.totals,
            reverted: run.reverted,
            failure_reason: run.failure_reason.clone(),
        }
    }
}

/// A partial update to a payroll run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRunPatch {
    /// New status.
    pub status: Option<RunStatus>,
    /// New stage.
    pub stage: Option<RunStage>,
    /// New counters.
    pub counters: Option<RunCounters>,
    /// New totals.
    pub totals: Option<RunTotals>,
    /// Failure reason to record.
    pub failure_reason: Option<String>,
    /// Reverted flag.
    pub reverted: Option<bool>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PayrollRunPatch {
    /// Checks that the patch's status change is allowed for the run.
    ///
    /// Re-applying the current status is accepted so a retried write stays
    /// idempotent. A reverted run never changes status again.
    pub fn validate(&self, run: &PayrollRun) -> EngineResult<()> {
        let Some(to) = self.status else {
            return Ok(());
        };
        if to == run.status {
            return Ok(());
        }
        if run.reverted || !run.status.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                entity: "payroll_run",
                from: if run.reverted {
                    "reverted".to_string()
                } else {
                    run.status.as_str().to_string()
                },
                to: to.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Applies the patch to a run. Callers check [`validate`](Self::validate)
    /// first.
    pub fn apply(&self, run: &mut PayrollRun) {
        if let Some(status) = self.status {
            run.status = status;
        }
        if let Some(stage) = self.stage {
            run.stage = stage;
        }
        if let Some(counters) = self.counters {
            run.counters = counters;
        }
        if let Some(totals) = self.totals {
            run.totals = totals;
        }
        if let Some(reason) = &self.failure_reason {
            run.failure_reason = Some(reason.clone());
        }
        if let Some(reverted) = self.reverted {
            run.reverted = reverted;
        }
        if let Some(at) = self.completed_at {
            run.completed_at = Some(at);
        }
    }
}

/// Status of a payroll record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Computed; may still be recomputed.
    Calculated,
    /// Checked and frozen.
    Verified,
    /// Paid out.
    Paid,
    /// Calculation failed; see the error message.
    Error,
}

impl RecordStatus {
    /// Returns the status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Calculated => "calculated",
            RecordStatus::Verified => "verified",
            RecordStatus::Paid => "paid",
            RecordStatus::Error => "error",
        }
    }

    /// Returns true if the record may be recomputed.
    pub fn is_recomputable(&self) -> bool {
        matches!(self, RecordStatus::Calculated | RecordStatus::Error)
    }

    /// Returns true if the record state machine allows moving from `self` to `to`.
    pub fn can_transition_to(&self, to: RecordStatus) -> bool {
        matches!(
            (self, to),
            (RecordStatus::Calculated, RecordStatus::Verified)
                | (RecordStatus::Verified, RecordStatus::Paid)
        )
    }
}

/// A loan installment as it was handled on a payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedLoanDeduction {
    /// The loan.
    pub loan_id: String,
    /// The installment number.
    pub installment_no: u32,
    /// Installment amount; only counted in pay when deducted.
    pub amount: Paise,
    /// Principal portion.
    pub principal: Paise,
    /// Outcome.
    pub status: LoanDeductionStatus,
}

/// The payroll result for one employee in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// Unique identifier for the record.
    pub id: String,
    /// The owning run.
    pub run_id: String,
    /// The employee.
    pub employee_id: String,
    /// The month paid.
    pub period: PayrollPeriod,
    /// Working days in the month.
    pub working_days: Decimal,
    /// Paid days.
    pub paid_days: Decimal,
    /// Loss-of-pay days.
    pub lop_days: Decimal,
    /// Earned salary components after proration.
    pub earnings: SalaryComponents,
    /// Sum of earned components.
    pub gross_earnings: Paise,
    /// Provident Fund amounts.
    pub provident_fund: ProvidentFundContribution,
    /// ESI amounts.
    pub esi: EsiContribution,
    /// Professional tax.
    pub professional_tax: Paise,
    /// Income tax withheld.
    pub tds: Paise,
    /// Loan installments considered this month.
    pub loan_deductions: Vec<AppliedLoanDeduction>,
    /// Sum of deducted installments.
    pub loan_recovery: Paise,
    /// All employee-side deductions.
    pub total_deductions: Paise,
    /// Gross less deductions.
    pub net_pay: Paise,
    /// Record status.
    pub status: RecordStatus,
    /// The cause of an `Error` record.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Calculation steps.
    #[serde(default)]
    pub audit_trail: Vec<AuditStep>,
    /// When the record was produced.
    pub calculated_at: DateTime<Utc>,
}

impl PayrollRecord {
    /// Creates an `Error` record carrying the failure message.
    pub fn error(
        run_id: &str,
        employee_id: &str,
        period: PayrollPeriod,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            employee_id: employee_id.to_string(),
            period,
            working_days: Decimal::ZERO,
            paid_days: Decimal::ZERO,
            lop_days: Decimal::ZERO,
            earnings: SalaryComponents::default(),
            gross_earnings: Paise::ZERO,
            provident_fund: ProvidentFundContribution::default(),
            esi: EsiContribution::default(),
            professional_tax: Paise::ZERO,
            tds: Paise::ZERO,
            loan_deductions: Vec::new(),
            loan_recovery: Paise::ZERO,
            total_deductions: Paise::ZERO,
            net_pay: Paise::ZERO,
            status: RecordStatus::Error,
            error_message: Some(message.into()),
            audit_trail: Vec::new(),
            calculated_at: now,
        }
    }

    /// Returns the loss-of-pay days as whole non-contributing days for PF
    /// filing, rounded half away from zero.
    pub fn ncp_days(&self) -> u32 {
        crate::money::round_half_away(self.lop_days)
            .to_u32()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> PayrollPeriod {
        PayrollPeriod::new(4, 2025).unwrap()
    }

    #[test]
    fn test_run_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Processing));
        assert!(RunStatus::Processing.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Processing.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Processing));
    }

    #[test]
    fn test_record_immutable_from_verified() {
        assert!(RecordStatus::Calculated.is_recomputable());
        assert!(RecordStatus::Error.is_recomputable());
        assert!(!RecordStatus::Verified.is_recomputable());
        assert!(!RecordStatus::Paid.is_recomputable());
        assert!(RecordStatus::Verified.can_transition_to(RecordStatus::Paid));
        assert!(!RecordStatus::Error.can_transition_to(RecordStatus::Verified));
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut run = PayrollRun::new(period(), Utc::now());
        let patch = PayrollRunPatch {
            status: Some(RunStatus::Processing),
            stage: Some(RunStage::LoadingEmployees),
            ..Default::default()
        };
        patch.apply(&mut run);
        assert_eq!(run.status, RunStatus::Processing);
        assert_eq!(run.stage, RunStage::LoadingEmployees);
        assert!(!run.reverted);
        assert!(run.failure_reason.is_none());
    }

    #[test]
    fn test_patch_cannot_complete_a_failed_run() {
        let mut run = PayrollRun::new(period(), Utc::now());
        run.status = RunStatus::Failed;
        run.failure_reason = Some("cancelled: operator".to_string());
        let patch = PayrollRunPatch {
            status: Some(RunStatus::Completed),
            ..Default::default()
        };

        match patch.validate(&run) {
            Err(EngineError::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, "failed");
                assert_eq!(to, "completed");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_repeating_status_is_accepted() {
        let mut run = PayrollRun::new(period(), Utc::now());
        run.status = RunStatus::Completed;
        let patch = PayrollRunPatch {
            status: Some(RunStatus::Completed),
            reverted: Some(true),
            ..Default::default()
        };
        assert!(patch.validate(&run).is_ok());
    }

    #[test]
    fn test_reverted_run_keeps_its_status() {
        let mut run = PayrollRun::new(period(), Utc::now());
        run.reverted = true;
        let patch = PayrollRunPatch {
            status: Some(RunStatus::Processing),
            ..Default::default()
        };
        assert!(patch.validate(&run).is_err());
    }

    #[test]
    fn test_totals_ignore_error_records() {
        let mut totals = RunTotals::default();
        let record = PayrollRecord::error("run-1", "emp_007", period(), "boom", Utc::now());
        totals.add(&record);
        assert_eq!(totals, RunTotals::default());
    }

    #[test]
    fn test_ncp_days_round_half_away() {
        let mut record = PayrollRecord::error("run-1", "emp_001", period(), "x", Utc::now());
        record.lop_days = Decimal::new(25, 1);
        assert_eq!(record.ncp_days(), 3);
        record.lop_days = Decimal::new(15, 1);
        assert_eq!(record.ncp_days(), 2);
        record.lop_days = Decimal::ZERO;
        assert_eq!(record.ncp_days(), 0);
    }

    #[test]
    fn test_reverted_run_no_longer_blocks_period() {
        let mut run = PayrollRun::new(period(), Utc::now());
        assert!(run.blocks_period());
        run.reverted = true;
        assert!(!run.blocks_period());
    }
}
