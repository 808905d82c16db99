//! Attendance summary and attendance lock models.
//!
//! Attendance is aggregated outside the engine into an [`AttendanceSummary`]
//! per employee and month. An [`AttendanceLock`] freezes a month's attendance
//! for payroll; corrections require an unlock request that must be approved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::PayrollPeriod;

/// Day counts for one employee and month.
///
/// Days are decimals so half-day leave can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Days the employee was expected to work.
    pub working_days: Decimal,
    /// Days that are paid (present, paid leave, holidays).
    pub paid_days: Decimal,
    /// Loss-of-pay days.
    pub lop_days: Decimal,
}

impl AttendanceSummary {
    /// Creates a summary with no loss of pay.
    pub fn full_month(working_days: Decimal) -> Self {
        Self {
            working_days,
            paid_days: working_days,
            lop_days: Decimal::ZERO,
        }
    }

    /// Validates the day counts.
    ///
    /// Working days must be positive, no count may be negative, and paid plus
    /// loss-of-pay days must equal working days.
    pub fn validate(&self) -> EngineResult<()> {
        if self.working_days <= Decimal::ZERO {
            return Err(EngineError::validation(
                "working_days",
                format!("must be positive, got {}", self.working_days),
            ));
        }
        if self.paid_days < Decimal::ZERO || self.lop_days < Decimal::ZERO {
            return Err(EngineError::validation(
                "paid_days",
                "paid and loss-of-pay days must not be negative",
            ));
        }
        if self.paid_days + self.lop_days != self.working_days {
            return Err(EngineError::validation(
                "paid_days",
                format!(
                    "paid {} + lop {} does not equal working {}",
                    self.paid_days, self.lop_days, self.working_days
                ),
            ));
        }
        Ok(())
    }
}

/// State of an attendance lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// Attendance is frozen; payroll may run.
    Locked,
    /// A correction was requested; payroll is blocked until resolved.
    UnlockRequested,
    /// Attendance is open for corrections.
    Unlocked,
}

impl LockStatus {
    fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Locked => "locked",
            LockStatus::UnlockRequested => "unlock_requested",
            LockStatus::Unlocked => "unlocked",
        }
    }
}

/// The attendance lock for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceLock {
    /// The locked month.
    pub period: PayrollPeriod,
    /// Current state.
    pub status: LockStatus,
    /// Who locked the month.
    pub locked_by: String,
    /// When the month was locked.
    pub locked_at: DateTime<Utc>,
    /// Who asked for the current unlock, if any.
    #[serde(default)]
    pub unlock_requested_by: Option<String>,
    /// Why the unlock was requested.
    #[serde(default)]
    pub unlock_reason: Option<String>,
    /// Who approved the last unlock.
    #[serde(default)]
    pub unlock_approved_by: Option<String>,
}

impl AttendanceLock {
    /// Locks a month.
    pub fn lock(period: PayrollPeriod, locked_by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            period,
            status: LockStatus::Locked,
            locked_by: locked_by.into(),
            locked_at: at,
            unlock_requested_by: None,
            unlock_reason: None,
            unlock_approved_by: None,
        }
    }

    /// Returns true if payroll may run against this month.
    pub fn permits_payroll(&self) -> bool {
        self.status == LockStatus::Locked
    }

    /// Records a request to unlock the month for corrections.
    pub fn request_unlock(
        &mut self,
        requested_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        self.transition(LockStatus::Locked, LockStatus::UnlockRequested)?;
        self.unlock_requested_by = Some(requested_by.into());
        self.unlock_reason = Some(reason.into());
        Ok(())
    }

    /// Approves a pending unlock request.
    pub fn approve_unlock(&mut self, approved_by: impl Into<String>) -> EngineResult<()> {
        self.transition(LockStatus::UnlockRequested, LockStatus::Unlocked)?;
        self.unlock_approved_by = Some(approved_by.into());
        Ok(())
    }

    /// Rejects a pending unlock request, keeping the month locked.
    pub fn reject_unlock(&mut self) -> EngineResult<()> {
        self.transition(LockStatus::UnlockRequested, LockStatus::Locked)?;
        self.unlock_requested_by = None;
        self.unlock_reason = None;
        Ok(())
    }

    /// Locks the month again after corrections.
    pub fn relock(&mut self, locked_by: impl Into<String>, at: DateTime<Utc>) -> EngineResult<()> {
        self.transition(LockStatus::Unlocked, LockStatus::Locked)?;
        self.locked_by = locked_by.into();
        self.locked_at = at;
        self.unlock_requested_by = None;
        self.unlock_reason = None;
        Ok(())
    }

    fn transition(&mut self, expected: LockStatus, to: LockStatus) -> EngineResult<()> {
        if self.status != expected {
            return Err(EngineError::InvalidTransition {
                entity: "attendance_lock",
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
