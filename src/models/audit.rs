//! Audit trail entries attached to calculation results.

use serde::{Deserialize, Serialize};

/// A single step in a payroll calculation, recorded for review.
///
/// Each step names the rule that was applied, the statute or configuration
/// it comes from, and a human-readable explanation of the figures.
///
/// # Example
///
/// ```
/// use payroll_engine::models::AuditStep;
///
/// let step = AuditStep::new(
///     "pf_employee",
///     "Provident Fund - Employee",
///     "EPF Scheme 1952, para 29",
///     "12% of ₹12000.00 = ₹1440.00",
/// );
/// assert_eq!(step.rule_id, "pf_employee");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Reference to the statute or configuration the rule implements.
    pub statute_ref: String,
    /// Human-readable explanation of the result.
    pub reasoning: String,
}

impl AuditStep {
    /// Creates a new audit step.
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        statute_ref: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            statute_ref: statute_ref.into(),
            reasoning: reasoning.into(),
        }
    }
}
