//! Due-date rules.

use chrono::NaiveDate;

use crate::config::{DeadlineFrequency, DeadlineRule};
use crate::models::PayrollPeriod;

/// Returns true if the rule creates an obligation for the period.
///
/// Quarterly rules apply at financial-year quarter ends, annual rules at
/// March.
pub fn applies_to(rule: &DeadlineRule, period: PayrollPeriod) -> bool {
    match rule.frequency {
        DeadlineFrequency::Monthly => true,
        DeadlineFrequency::Quarterly => period.is_fy_quarter_end(),
        DeadlineFrequency::Annual => period.month == 3,
    }
}

/// Computes the due date of the period's obligation, or `None` if the rule
/// does not apply to the period.
///
/// The due day is clamped to the length of the due month. March uses the
/// rule's year-end override when it has one.
///
/// # Example
///
/// ```
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::deadlines::due_date;
/// use payroll_engine::models::{DeadlineType, PayrollPeriod};
///
/// let loader = ConfigLoader::load("./config/india").unwrap();
/// let rule = loader
///     .config()
///     .deadlines()
///     .rules
///     .iter()
///     .find(|r| r.deadline_type == DeadlineType::ProfessionalTax)
///     .unwrap();
///
/// // Due on the 31st of the next month, clamped to June 30
/// let due = due_date(rule, PayrollPeriod::new(5, 2025).unwrap()).unwrap();
/// assert_eq!(due.to_string(), "2025-06-30");
/// ```
pub fn due_date(rule: &DeadlineRule, period: PayrollPeriod) -> Option<NaiveDate> {
    if !applies_to(rule, period) {
        return None;
    }

    let (month_offset, day) = match rule.year_end_override {
        Some(o) if period.month == 3 => (o.month_offset, o.day_of_month),
        _ => (rule.due_month_offset, rule.day_of_month),
    };
    Some(period.plus_months(month_offset).day_clamped(day))
}
