//! Provident Fund contribution calculation.
//!
//! The employee contributes a flat rate of PF wages, where PF wages are basic
//! pay capped at the statutory wage ceiling. The employer's matching share is
//! split between the pension scheme (EPS, capped at a fixed monthly amount)
//! and the provident fund proper (EPF), which absorbs whatever the pension
//! cap cuts off, so EPF + EPS always equals the employer share. EDLI
//! insurance and administration charges are levied on top.

use serde::{Deserialize, Serialize};

use crate::config::ProvidentFundConfig;
use crate::models::AuditStep;
use crate::money::Paise;

/// Provident Fund amounts for one employee and month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidentFundContribution {
    /// Basic pay capped at the wage ceiling; the base for every PF line.
    pub wages: Paise,
    /// Employee contribution.
    pub employee: Paise,
    /// Employer contribution to the provident fund account.
    pub employer_epf: Paise,
    /// Employer contribution to the pension scheme.
    pub employer_eps: Paise,
    /// Employer deposit-linked insurance contribution.
    pub employer_edli: Paise,
    /// Employer administration charges.
    pub admin_charges: Paise,
}

impl ProvidentFundContribution {
    /// Returns EPF + EPS, the employer share matching the employee's.
    pub fn employer_share(&self) -> Paise {
        self.employer_epf + self.employer_eps
    }

    /// Returns every employer-side amount including EDLI and admin charges.
    pub fn employer_total(&self) -> Paise {
        self.employer_share() + self.employer_edli + self.admin_charges
    }
}

/// The result of a PF calculation, including the amounts and audit step.
#[derive(Debug, Clone)]
pub struct ProvidentFundResult {
    /// The computed amounts.
    pub contribution: ProvidentFundContribution,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates Provident Fund contributions on earned basic pay.
///
/// A non-positive basis yields all zeros.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_provident_fund;
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::money::Paise;
///
/// # let loader = ConfigLoader::load("./config/india").unwrap();
/// # let config = loader.config().provident_fund();
/// let result = calculate_provident_fund(Paise::from_rupees(12_000), config);
/// assert_eq!(result.contribution.employee, Paise::new(144_000));
/// assert_eq!(result.contribution.employer_eps, Paise::new(99_960));
/// ```
pub fn calculate_provident_fund(basic: Paise, config: &ProvidentFundConfig) -> ProvidentFundResult {
    if !basic.is_positive() {
        return ProvidentFundResult {
            contribution: ProvidentFundContribution::default(),
            audit_step: AuditStep::new(
                "provident_fund",
                "Provident Fund",
                &config.statute_ref,
                format!("No PF: basis {} is not positive", basic),
            ),
        };
    }

    let wages = basic.min(config.wage_ceiling);
    let employee = wages.percent(config.employee_rate);
    let employer_share = wages.percent(config.employer_rate);

    let eps_uncapped = wages.percent(config.eps_rate);
    let employer_eps = eps_uncapped.min(config.eps_monthly_cap);
    // the pension cap's excess stays in EPF
    let employer_epf = employer_share - employer_eps;

    let contribution = ProvidentFundContribution {
        wages,
        employee,
        employer_epf,
        employer_eps,
        employer_edli: wages.percent(config.edli_rate),
        admin_charges: wages.percent(config.admin_rate),
    };

    let cap_note = if employer_eps < eps_uncapped {
        format!(" (EPS capped from {})", eps_uncapped)
    } else {
        String::new()
    };

    let audit_step = AuditStep::new(
        "provident_fund",
        "Provident Fund",
        &config.statute_ref,
        format!(
            "PF wages min({}, {}) = {}; employee {}% = {}; EPS {}{}; EPF {}",
            basic,
            config.wage_ceiling,
            wages,
            config.employee_rate,
            employee,
            employer_eps,
            cap_note,
            employer_epf
        ),
    );

    ProvidentFundResult {
        contribution,
        audit_step,
    }
}
