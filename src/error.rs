//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! Every [`EngineError`] belongs to one [`ErrorKind`], which decides how the
//! orchestrator treats it: per-employee failures are recorded on that
//! employee's record, run-integrity failures stop a run before any record is
//! written, and transient storage failures are retried.

use thiserror::Error;

use crate::ports::StoreError;

/// Broad classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration could not be loaded.
    Configuration,
    /// Bad input detected before processing starts.
    Validation,
    /// A failure confined to one employee's calculation.
    PerEmployeeCalculation,
    /// A storage failure that may succeed on retry.
    TransientStorage,
    /// A run precondition or integrity rule was violated.
    RunIntegrity,
    /// A non-transient storage failure.
    Storage,
}

/// The main error type for the Payroll Engine.
///
/// # Example
///
/// ```
/// use payroll_engine::error::{EngineError, ErrorKind};
///
/// let error = EngineError::AttendanceNotLocked { month: 4, year: 2025 };
/// assert_eq!(error.to_string(), "Attendance for 04/2025 is not locked");
/// assert_eq!(error.kind(), ErrorKind::RunIntegrity);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// An input field failed validation.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A payroll period was out of range.
    #[error("Invalid payroll period {month}/{year}")]
    InvalidPeriod {
        /// The month supplied.
        month: u32,
        /// The year supplied.
        year: i32,
    },

    /// A status transition is not allowed by the entity's state machine.
    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        /// The entity whose state was being changed.
        entity: &'static str,
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },

    /// An operation required a completed run.
    #[error("Payroll run {run_id} is {status}, expected completed")]
    RunNotCompleted {
        /// The run that was not completed.
        run_id: String,
        /// Its current status.
        status: String,
    },

    /// The attendance lock for the period is missing or not in the locked state.
    #[error("Attendance for {month:02}/{year} is not locked")]
    AttendanceNotLocked {
        /// The payroll month.
        month: u32,
        /// The payroll year.
        year: i32,
    },

    /// A non-reverted run already exists for the period.
    #[error("Payroll run {existing_run_id} already exists for {month:02}/{year}")]
    DuplicateRun {
        /// The payroll month.
        month: u32,
        /// The payroll year.
        year: i32,
        /// The run that already covers the period.
        existing_run_id: String,
    },

    /// A payroll record is past its immutability boundary.
    #[error("Payroll record for employee '{employee_id}' is {status} and cannot be changed")]
    RecordLocked {
        /// The employee the record belongs to.
        employee_id: String,
        /// The record's current status.
        status: String,
    },

    /// No salary structure is effective for the employee on the date.
    #[error("No salary structure effective for employee '{employee_id}' on {as_of}")]
    MissingSalaryStructure {
        /// The employee.
        employee_id: String,
        /// The date the structure was looked up for.
        as_of: chrono::NaiveDate,
    },

    /// A calculation for one employee failed.
    #[error("Calculation failed for employee '{employee_id}': {message}")]
    Calculation {
        /// The employee whose calculation failed.
        employee_id: String,
        /// A description of the failure.
        message: String,
    },

    /// A storage operation kept failing transiently until the retry budget ran out.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The storage operation.
        operation: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last error seen.
        last_error: String,
    },

    /// A storage port returned an error.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ErrorKind::Configuration
            }
            EngineError::Validation { .. }
            | EngineError::InvalidPeriod { .. }
            | EngineError::InvalidTransition { .. }
            | EngineError::RunNotCompleted { .. } => ErrorKind::Validation,
            EngineError::AttendanceNotLocked { .. }
            | EngineError::DuplicateRun { .. }
            | EngineError::RecordLocked { .. } => ErrorKind::RunIntegrity,
            EngineError::MissingSalaryStructure { .. }
            | EngineError::Calculation { .. }
            | EngineError::RetriesExhausted { .. } => ErrorKind::PerEmployeeCalculation,
            EngineError::Storage(StoreError::Transient { .. }) => ErrorKind::TransientStorage,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientStorage
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
