//! Income tax withholding (TDS) on salary.
//!
//! The month's gross is projected over the financial year, reduced by the
//! regime's standard deduction, and taxed through the regime's progressive
//! slabs. The section 87A rebate wipes out the tax when taxable income is
//! at or below the regime threshold, and cess is charged on what remains.
//! The annual liability less tax already withheld this year is spread evenly
//! over the months left, so under- or over-withholding in earlier months is
//! corrected before March.

use rust_decimal::Decimal;

use crate::config::TaxRegimeConfig;
use crate::models::{AuditStep, PayrollPeriod};
use crate::money::Paise;

/// Annual tax figures behind a month's withholding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnualTax {
    /// Monthly gross times twelve.
    pub projected_income: Paise,
    /// Projected income less the standard deduction, floored at zero.
    pub taxable_income: Paise,
    /// Tax from the progressive slabs.
    pub slab_tax: Paise,
    /// Rebate granted.
    pub rebate: Paise,
    /// Cess on tax after rebate.
    pub cess: Paise,
    /// Tax after rebate plus cess.
    pub total: Paise,
}

/// The result of a TDS calculation.
#[derive(Debug, Clone)]
pub struct TdsResult {
    /// Tax to withhold this month.
    pub monthly_tds: Paise,
    /// The annual computation.
    pub annual: AnnualTax,
    /// Months left in the financial year, counting this one.
    pub remaining_months: u32,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Computes slab tax on taxable income, rounding each slab's share.
pub fn slab_tax(taxable_income: Paise, table: &TaxRegimeConfig) -> Paise {
    table
        .slabs
        .iter()
        .filter(|slab| taxable_income > slab.from)
        .map(|slab| {
            let upper = slab.to.map_or(taxable_income, |to| taxable_income.min(to));
            (upper - slab.from).percent(slab.rate)
        })
        .sum()
}

/// Computes the annual tax on a projected salary income.
pub fn annual_tax(projected_income: Paise, table: &TaxRegimeConfig, cess_rate: Decimal) -> AnnualTax {
    let taxable_income = (projected_income - table.standard_deduction).floor_zero();
    let slab_tax = slab_tax(taxable_income, table);
    let rebate = if taxable_income <= table.rebate_threshold {
        slab_tax
    } else {
        Paise::ZERO
    };
    let after_rebate = slab_tax - rebate;
    let cess = after_rebate.percent(cess_rate);

    AnnualTax {
        projected_income,
        taxable_income,
        slab_tax,
        rebate,
        cess,
        total: after_rebate + cess,
    }
}

/// Calculates the TDS to withhold for a month.
///
/// `withheld_to_date` is tax already withheld in earlier months of the same
/// financial year.
///
/// # Examples
///
/// ```no_run
/// use payroll_engine::calculation::calculate_tds;
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::models::{PayrollPeriod, TaxRegime};
/// use payroll_engine::money::Paise;
///
/// let loader = ConfigLoader::load("./config/india").unwrap();
/// let table = loader.get_tax_regime(TaxRegime::New, 2025).unwrap();
/// let cess = loader.config().income_tax().cess_rate;
/// let period = PayrollPeriod::new(4, 2025).unwrap();
///
/// let result = calculate_tds(Paise::from_rupees(150_000), Paise::ZERO, period, table, cess, "s.192");
/// // ₹18,00,000 projected, ₹1,50,800 annual tax over 12 months
/// assert_eq!(result.monthly_tds, Paise::new(1_256_667));
/// ```
pub fn calculate_tds(
    monthly_gross: Paise,
    withheld_to_date: Paise,
    period: PayrollPeriod,
    table: &TaxRegimeConfig,
    cess_rate: Decimal,
    statute_ref: &str,
) -> TdsResult {
    let projected = Paise::new(monthly_gross.floor_zero().value().saturating_mul(12));
    let annual = annual_tax(projected, table, cess_rate);

    let remaining_months = period.remaining_fy_months();
    let outstanding = (annual.total - withheld_to_date).floor_zero();
    let monthly_tds = outstanding.divide_rounded(remaining_months);

    let audit_step = AuditStep::new(
        "tds",
        "Income Tax Withholding",
        statute_ref,
        format!(
            "{} regime FY {}: projected {}, taxable {}, slab tax {}, rebate {}, cess {}, annual {}; \
             ({} - withheld {}) / {} months = {}",
            table.regime.as_str(),
            period.fy_label(),
            annual.projected_income,
            annual.taxable_income,
            annual.slab_tax,
            annual.rebate,
            annual.cess,
            annual.total,
            annual.total,
            withheld_to_date,
            remaining_months,
            monthly_tds
        ),
    );

    TdsResult {
        monthly_tds,
        annual,
        remaining_months,
        audit_step,
    }
}
