//! Core data models for the Payroll Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod audit;
mod deadline;
mod employee;
mod loan;
mod payroll;
mod period;
mod salary;

pub use attendance::{AttendanceLock, AttendanceSummary, LockStatus};
pub use audit::AuditStep;
pub use deadline::{
    AlertThreshold, DeadlineAlert, DeadlineStatus, DeadlineType, StatutoryDeadline,
};
pub use employee::{Gender, PayrollEmployee};
pub use loan::{
    EmployeeLoan, LoanDeduction, LoanDeductionStatus, LoanDeductionUpdate, LoanStatus,
};
pub use payroll::{
    AppliedLoanDeduction, PayrollRecord, PayrollRun, PayrollRunPatch, RecordStatus, RunCounters,
    RunStage, RunStatus, RunSummary, RunTotals,
};
pub use period::PayrollPeriod;
pub use salary::{SalaryComponents, SalaryStructure, TaxRegime};
