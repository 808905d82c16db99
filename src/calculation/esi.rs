//! ESI contribution calculation.
//!
//! ESI is a flat percentage of gross earnings, split between employee and
//! employer, and only applies while monthly gross is at or below the
//! eligibility ceiling.

use serde::{Deserialize, Serialize};

use crate::config::EsiConfig;
use crate::models::AuditStep;
use crate::money::Paise;

/// ESI amounts for one employee and month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsiContribution {
    /// Whether the employee was covered this month.
    pub covered: bool,
    /// Wages the contribution was computed on.
    pub wages: Paise,
    /// Employee contribution.
    pub employee: Paise,
    /// Employer contribution.
    pub employer: Paise,
}

/// The result of an ESI calculation, including the amounts and audit step.
#[derive(Debug, Clone)]
pub struct EsiResult {
    /// The computed amounts.
    pub contribution: EsiContribution,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates ESI contributions on gross earnings.
pub fn calculate_esi(gross: Paise, config: &EsiConfig) -> EsiResult {
    if !gross.is_positive() || gross > config.eligibility_ceiling {
        return EsiResult {
            contribution: EsiContribution::default(),
            audit_step: AuditStep::new(
                "esi",
                "Employees' State Insurance",
                &config.statute_ref,
                format!(
                    "Not covered: gross {} outside (0, {}]",
                    gross, config.eligibility_ceiling
                ),
            ),
        };
    }

    let employee = gross.percent(config.employee_rate);
    let employer = gross.percent(config.employer_rate);

    EsiResult {
        contribution: EsiContribution {
            covered: true,
            wages: gross,
            employee,
            employer,
        },
        audit_step: AuditStep::new(
            "esi",
            "Employees' State Insurance",
            &config.statute_ref,
            format!(
                "{} x {}% = {} employee; x {}% = {} employer",
                gross, config.employee_rate, employee, config.employer_rate, employer
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_config() -> EsiConfig {
        EsiConfig {
            statute_ref: "ESI Act 1948".to_string(),
            employee_rate: dec("0.75"),
            employer_rate: dec("3.25"),
            eligibility_ceiling: Paise::from_rupees(21_000),
        }
    }

    /// ESI-001: gross below ceiling is covered
    #[test]
    fn test_gross_below_ceiling_is_covered() {
        let result = calculate_esi(Paise::from_rupees(18_000), &test_config());
        let esi = result.contribution;

        assert!(esi.covered);
        assert_eq!(esi.employee, Paise::new(13_500));
        assert_eq!(esi.employer, Paise::new(58_500));
        assert_eq!(result.audit_step.rule_id, "esi");
    }

    /// ESI-002: gross exactly at ceiling is covered
    #[test]
    fn test_gross_at_ceiling_is_covered() {
        let esi = calculate_esi(Paise::from_rupees(21_000), &test_config()).contribution;
        assert!(esi.covered);
        assert_eq!(esi.employee, Paise::new(15_750));
    }

    /// ESI-003: gross above ceiling is not covered
    #[test]
    fn test_gross_above_ceiling_is_zero() {
        let result = calculate_esi(Paise::new(2_100_001), &test_config());
        assert_eq!(result.contribution, EsiContribution::default());
        assert!(result.audit_step.reasoning.contains("Not covered"));
    }

    #[test]
    fn test_zero_gross_is_not_covered() {
        let esi = calculate_esi(Paise::ZERO, &test_config()).contribution;
        assert!(!esi.covered);
    }

    #[test]
    fn test_employee_share_rounds_half_away() {
        // 12,345.67 * 0.75% = 92.5925 -> 92.59
        let esi = calculate_esi(Paise::new(1_234_567), &test_config()).contribution;
        assert_eq!(esi.employee, Paise::new(9_259));
    }
}
