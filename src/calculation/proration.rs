//! Attendance proration of salary components.

use crate::error::EngineResult;
use crate::models::{AttendanceSummary, AuditStep, SalaryComponents};

/// The result of prorating a salary structure by attendance.
#[derive(Debug, Clone)]
pub struct ProrationResult {
    /// Earned components for the month.
    pub earned: SalaryComponents,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Scales each component by `paid_days / working_days`, rounding each
/// component separately.
///
/// Fails if the attendance summary is inconsistent.
pub fn prorate_salary(
    components: &SalaryComponents,
    attendance: &AttendanceSummary,
) -> EngineResult<ProrationResult> {
    attendance.validate()?;

    let earned = components.map(|amount| amount.prorate(attendance.paid_days, attendance.working_days));

    let reasoning = if attendance.paid_days == attendance.working_days {
        format!(
            "Full month: {} of {} days paid, gross {}",
            attendance.paid_days,
            attendance.working_days,
            earned.gross()
        )
    } else {
        format!(
            "{} of {} days paid ({} LOP): gross {} -> {}",
            attendance.paid_days,
            attendance.working_days,
            attendance.lop_days,
            components.gross(),
            earned.gross()
        )
    };

    Ok(ProrationResult {
        earned,
        audit_step: AuditStep::new("proration", "Attendance Proration", "Payment of Wages Act 1936", reasoning),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::money::Paise;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn components() -> SalaryComponents {
        SalaryComponents {
            basic: Paise::from_rupees(30_000),
            hra: Paise::from_rupees(12_000),
            special_allowance: Paise::from_rupees(10_000),
            lta: Paise::ZERO,
            medical: Paise::from_rupees(1_250),
            conveyance: Paise::from_rupees(1_600),
            other_allowances: Paise::ZERO,
        }
    }

    fn attendance(working: &str, paid: &str, lop: &str) -> AttendanceSummary {
        AttendanceSummary {
            working_days: dec(working),
            paid_days: dec(paid),
            lop_days: dec(lop),
        }
    }

    /// PRO-001: full month earns every component in full
    #[test]
    fn test_full_month_is_unchanged() {
        let result = prorate_salary(&components(), &attendance("30", "30", "0")).unwrap();
        assert_eq!(result.earned, components());
        assert!(result.audit_step.reasoning.starts_with("Full month"));
    }

    /// PRO-002: each component is rounded on its own
    #[test]
    fn test_half_day_lop_rounds_each_component() {
        let result = prorate_salary(&components(), &attendance("31", "29.5", "1.5")).unwrap();

        assert_eq!(result.earned.basic, Paise::new(2_854_839));
        // 12,000 * 29.5 / 31 = 11,419.3548...
        assert_eq!(result.earned.hra, Paise::new(1_141_935));
        assert_eq!(result.earned.lta, Paise::ZERO);
    }

    /// PRO-003: inconsistent attendance is a validation error
    #[test]
    fn test_inconsistent_attendance_rejected() {
        let result = prorate_salary(&components(), &attendance("30", "28", "1"));
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_zero_paid_days_earns_nothing() {
        let result = prorate_salary(&components(), &attendance("30", "0", "30")).unwrap();
        assert_eq!(result.earned.gross(), Paise::ZERO);
    }

    proptest! {
        #[test]
        fn prop_earned_never_exceeds_structure(paid_halves in 0u32..=60) {
            let paid = Decimal::from(paid_halves) / Decimal::from(2);
            let summary = AttendanceSummary {
                working_days: Decimal::from(30),
                paid_days: paid,
                lop_days: Decimal::from(30) - paid,
            };
            let earned = prorate_salary(&components(), &summary).unwrap().earned;
            prop_assert!(earned.gross() <= components().gross());
            prop_assert!(!earned.basic.is_negative());
        }
    }
}
