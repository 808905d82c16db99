//! Storage and notification ports.
//!
//! The engine never talks to a database or a mail server directly. It is
//! handed implementations of these traits, so the same orchestration runs
//! against Postgres in production and [`MemoryStore`](crate::store::MemoryStore)
//! in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AttendanceLock, AttendanceSummary, DeadlineAlert, DeadlineType, EmployeeLoan, LoanDeduction,
    LoanDeductionUpdate, PayrollEmployee, PayrollPeriod, PayrollRecord, PayrollRun,
    PayrollRunPatch, RecordStatus, RunSummary, SalaryStructure, StatutoryDeadline,
};
use crate::money::Paise;

/// Errors returned by port implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The call failed in a way that may succeed if retried.
    #[error("{operation} failed transiently: {message}")]
    Transient {
        /// The port operation.
        operation: String,
        /// Backend message.
        message: String,
    },

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// The write violates a uniqueness or state rule.
    #[error("{entity} conflict: {message}")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// What conflicted.
        message: String,
    },

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A type alias for Results returned by ports.
pub type StoreResult<T> = Result<T, StoreError>;

/// Payroll inputs and outputs.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Lists the employees in scope for a period.
    async fn list_payroll_employees(&self, period: PayrollPeriod) -> StoreResult<Vec<PayrollEmployee>>;

    /// Gets one employee.
    async fn get_payroll_employee(&self, employee_id: &str) -> StoreResult<Option<PayrollEmployee>>;

    /// Gets the salary structure effective for an employee on a date.
    async fn get_salary_structure(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> StoreResult<Option<SalaryStructure>>;

    /// Gets an employee's aggregated attendance for a period.
    async fn get_attendance_summary(
        &self,
        employee_id: &str,
        period: PayrollPeriod,
    ) -> StoreResult<Option<AttendanceSummary>>;

    /// Gets the attendance lock for a period.
    async fn get_attendance_lock(&self, period: PayrollPeriod) -> StoreResult<Option<AttendanceLock>>;

    /// Sums TDS on an employee's non-error records in non-reverted runs of
    /// the financial year, before `before`.
    async fn get_tds_withheld(
        &self,
        employee_id: &str,
        fy_start_year: i32,
        before: PayrollPeriod,
    ) -> StoreResult<Paise>;

    /// Creates a run. Fails with [`StoreError::Conflict`] if a non-reverted
    /// run already exists for its period.
    async fn create_payroll_run(&self, run: PayrollRun) -> StoreResult<()>;

    /// Gets a run.
    async fn get_payroll_run(&self, run_id: &str) -> StoreResult<Option<PayrollRun>>;

    /// Finds the non-reverted run for a period.
    async fn find_active_run(&self, period: PayrollPeriod) -> StoreResult<Option<PayrollRun>>;

    /// Applies a patch to a run and returns the updated run. Fails with
    /// [`StoreError::Conflict`] if the patch changes the status in a way
    /// [`PayrollRunPatch::validate`] rejects.
    async fn update_payroll_run(&self, run_id: &str, patch: PayrollRunPatch) -> StoreResult<PayrollRun>;

    /// Inserts or replaces the record for (run, employee) and applies the
    /// loan updates in the same commit. Replacing a verified or paid record
    /// fails with [`StoreError::Conflict`].
    async fn upsert_payroll_record(
        &self,
        record: PayrollRecord,
        loan_updates: Vec<LoanDeductionUpdate>,
    ) -> StoreResult<()>;

    /// Moves a record from `from` to `to` and returns it. Fails with
    /// [`StoreError::Conflict`] if the record is no longer in `from`.
    async fn set_record_status(
        &self,
        run_id: &str,
        employee_id: &str,
        from: RecordStatus,
        to: RecordStatus,
    ) -> StoreResult<PayrollRecord>;

    /// Gets the record for (run, employee).
    async fn get_payroll_record(
        &self,
        run_id: &str,
        employee_id: &str,
    ) -> StoreResult<Option<PayrollRecord>>;

    /// Lists a run's records ordered by employee id.
    async fn list_payroll_records(&self, run_id: &str) -> StoreResult<Vec<PayrollRecord>>;

    /// Deletes a run's records, returning how many were removed.
    async fn delete_payroll_records(&self, run_id: &str) -> StoreResult<usize>;
}

/// Employee loans and their deduction ledgers.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Saves a new loan with its ledger, or replaces the loan header if the
    /// ledger is empty.
    async fn save_loan(&self, loan: EmployeeLoan, deductions: Vec<LoanDeduction>) -> StoreResult<()>;

    /// Gets a loan.
    async fn get_loan(&self, loan_id: &str) -> StoreResult<Option<EmployeeLoan>>;

    /// Lists an employee's active loans.
    async fn get_active_loans(&self, employee_id: &str) -> StoreResult<Vec<EmployeeLoan>>;

    /// Gets a loan's installment for a period.
    async fn get_loan_deduction(
        &self,
        loan_id: &str,
        period: PayrollPeriod,
    ) -> StoreResult<Option<LoanDeduction>>;

    /// Lists a loan's ledger by installment number.
    async fn list_loan_deductions(&self, loan_id: &str) -> StoreResult<Vec<LoanDeduction>>;

    /// Applies installment updates atomically.
    async fn apply_loan_updates(&self, updates: Vec<LoanDeductionUpdate>) -> StoreResult<()>;
}

/// Statutory deadlines.
#[async_trait]
pub trait DeadlineStore: Send + Sync {
    /// Inserts a deadline, or refreshes the due date of an existing one for
    /// the same (type, period) while keeping its status and alert flags.
    /// Returns the stored row.
    async fn upsert_deadline(&self, deadline: StatutoryDeadline) -> StoreResult<StatutoryDeadline>;

    /// Gets a deadline.
    async fn get_deadline(
        &self,
        deadline_type: DeadlineType,
        period: PayrollPeriod,
    ) -> StoreResult<Option<StatutoryDeadline>>;

    /// Lists deadlines that are not filed, by due date.
    async fn list_open_deadlines(&self) -> StoreResult<Vec<StatutoryDeadline>>;

    /// Replaces a deadline.
    async fn update_deadline(&self, deadline: StatutoryDeadline) -> StoreResult<()>;
}

/// Outbound notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a deadline alert.
    async fn deadline_alert(&self, alert: &DeadlineAlert) -> StoreResult<()>;

    /// Reports a finished run.
    async fn run_finished(&self, summary: &RunSummary) -> StoreResult<()>;
}
