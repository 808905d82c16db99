//! Professional tax slab lookup.
//!
//! Professional tax is a state levy charged as a fixed monthly amount chosen
//! by gross-salary slab. Some states vary the amount by gender or charge a
//! higher figure in one month of the year (usually February) so the annual
//! total hits the constitutional cap.

use crate::config::{ProfessionalTaxConfig, ProfessionalTaxSlab};
use crate::models::{AuditStep, Gender, PayrollPeriod};
use crate::money::Paise;

const STATUTE_REF: &str = "Constitution of India, Art. 276";

/// The result of a professional-tax lookup.
#[derive(Debug, Clone)]
pub struct ProfessionalTaxResult {
    /// Tax for the month; zero when exempt.
    pub amount: Paise,
    /// The slab that matched, if any.
    pub slab: Option<ProfessionalTaxSlab>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Looks up the professional tax for a month's gross in a state.
///
/// Among matching slabs a month-specific slab beats one without a month,
/// then a gender-specific slab beats a gender-agnostic one. No match means
/// exempt.
pub fn calculate_professional_tax(
    gross: Paise,
    state: &str,
    gender: Gender,
    period: PayrollPeriod,
    config: &ProfessionalTaxConfig,
) -> ProfessionalTaxResult {
    let slab = config
        .slabs
        .iter()
        .filter(|s| s.state.eq_ignore_ascii_case(state))
        .filter(|s| gross >= s.salary_from && s.salary_to.is_none_or(|to| gross < to))
        .filter(|s| s.month.is_none_or(|m| m == period.month))
        .filter(|s| s.gender.is_none_or(|g| g == gender))
        .fold(None::<&ProfessionalTaxSlab>, |best, s| match best {
            Some(b) if specificity(b) >= specificity(s) => Some(b),
            _ => Some(s),
        });

    match slab {
        Some(slab) => ProfessionalTaxResult {
            amount: slab.amount,
            slab: Some(slab.clone()),
            audit_step: AuditStep::new(
                "professional_tax",
                "Professional Tax",
                STATUTE_REF,
                format!(
                    "{} slab from {}{}{}: gross {} -> {}",
                    slab.state,
                    slab.salary_from,
                    slab.month.map(|m| format!(", month {}", m)).unwrap_or_default(),
                    slab.gender
                        .map(|g| format!(", {:?}", g).to_lowercase())
                        .unwrap_or_default(),
                    gross,
                    slab.amount
                ),
            ),
        },
        None => ProfessionalTaxResult {
            amount: Paise::ZERO,
            slab: None,
            audit_step: AuditStep::new(
                "professional_tax",
                "Professional Tax",
                STATUTE_REF,
                format!("No {} slab matches gross {}; exempt", state, gross),
            ),
        },
    }
}

fn specificity(slab: &ProfessionalTaxSlab) -> (bool, bool) {
    (slab.month.is_some(), slab.gender.is_some())
}
