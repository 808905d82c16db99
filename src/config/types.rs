//! Configuration types for statutory payroll rules.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Monetary values are
//! integer paise; rates are decimal percentages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{DeadlineType, Gender, TaxRegime};
use crate::money::Paise;

/// The employer establishment the filings are made for.
#[derive(Debug, Clone, Deserialize)]
pub struct Establishment {
    /// PF establishment code.
    pub code: String,
    /// Registered name.
    pub name: String,
    /// ESI employer code.
    pub esi_employer_code: String,
}

/// Provident Fund parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidentFundConfig {
    /// Reference to the governing statute.
    pub statute_ref: String,
    /// Monthly wage ceiling for contributions.
    pub wage_ceiling: Paise,
    /// Employee contribution rate.
    pub employee_rate: Decimal,
    /// Employer share split between EPF and EPS.
    pub employer_rate: Decimal,
    /// Pension (EPS) rate.
    pub eps_rate: Decimal,
    /// Monthly cap on the pension contribution.
    pub eps_monthly_cap: Paise,
    /// Insurance (EDLI) rate.
    pub edli_rate: Decimal,
    /// Administration charges rate.
    pub admin_rate: Decimal,
}

/// ESI parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct EsiConfig {
    /// Reference to the governing statute.
    pub statute_ref: String,
    /// Employee contribution rate.
    pub employee_rate: Decimal,
    /// Employer contribution rate.
    pub employer_rate: Decimal,
    /// Highest monthly gross that is still covered.
    pub eligibility_ceiling: Paise,
}

/// A professional-tax slab.
///
/// A slab matches monthly gross in `[salary_from, salary_to)`; an absent
/// `salary_to` is open-ended. `month` and `gender` narrow the slab.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfessionalTaxSlab {
    /// State code.
    pub state: String,
    /// Inclusive lower bound of monthly gross.
    pub salary_from: Paise,
    /// Exclusive upper bound of monthly gross.
    #[serde(default)]
    pub salary_to: Option<Paise>,
    /// Monthly tax.
    pub amount: Paise,
    /// Only applies in this calendar month.
    #[serde(default)]
    pub month: Option<u32>,
    /// Only applies to this gender.
    #[serde(default)]
    pub gender: Option<Gender>,
}

/// Professional-tax configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfessionalTaxConfig {
    /// All slabs, any state.
    pub slabs: Vec<ProfessionalTaxSlab>,
}

/// A progressive income-tax slab.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeTaxSlab {
    /// Inclusive lower bound of taxable income.
    pub from: Paise,
    /// Upper bound of taxable income; `None` is open-ended.
    #[serde(default)]
    pub to: Option<Paise>,
    /// Rate applied to income inside the slab.
    pub rate: Decimal,
}

/// Income-tax rules for one regime from a given financial year onwards.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxRegimeConfig {
    /// The regime.
    pub regime: TaxRegime,
    /// First financial year (start year) the table applies to.
    pub effective_from_fy: i32,
    /// Standard deduction from salary income.
    pub standard_deduction: Paise,
    /// Taxable income up to which the full rebate applies.
    pub rebate_threshold: Paise,
    /// Progressive slabs, ascending.
    pub slabs: Vec<IncomeTaxSlab>,
}

/// Income-tax configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeTaxConfig {
    /// Reference to the governing statute.
    pub statute_ref: String,
    /// Health and education cess rate on tax.
    pub cess_rate: Decimal,
    /// Regime tables.
    pub regimes: Vec<TaxRegimeConfig>,
}

/// How often a statutory obligation recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineFrequency {
    /// Every month.
    Monthly,
    /// At each financial-year quarter end.
    Quarterly,
    /// Once per financial year, at March.
    Annual,
}

/// Due date used for the financial-year closing month instead of the normal rule.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct YearEndOverride {
    /// Months after March the obligation is due.
    pub month_offset: u32,
    /// Day of that month.
    pub day_of_month: u32,
}

/// A deadline rule.
#[derive(Debug, Clone, Deserialize)]
pub struct DeadlineRule {
    /// The obligation.
    #[serde(rename = "type")]
    pub deadline_type: DeadlineType,
    /// Recurrence.
    pub frequency: DeadlineFrequency,
    /// Day of the due month, clamped to the month's length.
    pub day_of_month: u32,
    /// Months after the period the obligation is due.
    #[serde(default = "default_month_offset")]
    pub due_month_offset: u32,
    /// Different due date for the March period.
    #[serde(default)]
    pub year_end_override: Option<YearEndOverride>,
}

fn default_month_offset() -> u32 {
    1
}

/// Deadlines configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct DeadlinesConfig {
    /// All deadline rules.
    pub rules: Vec<DeadlineRule>,
}

/// What to do with a loan installment when net pay cannot carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientNetPayPolicy {
    /// Always deduct, even if net pay goes negative.
    AlwaysDeduct,
    /// Skip when net pay after the installment would fall below `amount`.
    MinimumNetPay {
        /// The net pay floor.
        amount: Paise,
    },
    /// Skip when net pay after the installment would fall below `percent`
    /// of gross earnings.
    MinimumNetPayPercentOfGross {
        /// The floor as a percentage of gross.
        percent: Decimal,
    },
}

impl Default for InsufficientNetPayPolicy {
    fn default() -> Self {
        InsufficientNetPayPolicy::MinimumNetPay {
            amount: Paise::ZERO,
        }
    }
}

/// Bounded retry with exponential backoff for storage calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1_000,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PayrollSettings {
    /// Employee units processed concurrently.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    /// Storage retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Loan installment policy.
    #[serde(default)]
    pub loan_policy: InsufficientNetPayPolicy,
}

fn default_concurrency() -> usize {
    8
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
            loan_policy: InsufficientNetPayPolicy::default(),
        }
    }
}

/// The complete statutory configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct StatutoryConfig {
    establishment: Establishment,
    provident_fund: ProvidentFundConfig,
    esi: EsiConfig,
    professional_tax: ProfessionalTaxConfig,
    income_tax: IncomeTaxConfig,
    deadlines: DeadlinesConfig,
    payroll: PayrollSettings,
}

impl StatutoryConfig {
    /// Creates a configuration from its component parts.
    ///
    /// Tax regime tables are sorted by effective year, oldest first.
    pub fn new(
        establishment: Establishment,
        provident_fund: ProvidentFundConfig,
        esi: EsiConfig,
        professional_tax: ProfessionalTaxConfig,
        mut income_tax: IncomeTaxConfig,
        deadlines: DeadlinesConfig,
        payroll: PayrollSettings,
    ) -> Self {
        income_tax
            .regimes
            .sort_by_key(|r| (r.regime.as_str(), r.effective_from_fy));
        Self {
            establishment,
            provident_fund,
            esi,
            professional_tax,
            income_tax,
            deadlines,
            payroll,
        }
    }

    /// Returns the establishment.
    pub fn establishment(&self) -> &Establishment {
        &self.establishment
    }

    /// Returns the Provident Fund parameters.
    pub fn provident_fund(&self) -> &ProvidentFundConfig {
        &self.provident_fund
    }

    /// Returns the ESI parameters.
    pub fn esi(&self) -> &EsiConfig {
        &self.esi
    }

    /// Returns the professional-tax slabs.
    pub fn professional_tax(&self) -> &ProfessionalTaxConfig {
        &self.professional_tax
    }

    /// Returns the income-tax configuration.
    pub fn income_tax(&self) -> &IncomeTaxConfig {
        &self.income_tax
    }

    /// Returns the deadline rules.
    pub fn deadlines(&self) -> &DeadlinesConfig {
        &self.deadlines
    }

    /// Returns the orchestrator settings.
    pub fn payroll(&self) -> &PayrollSettings {
        &self.payroll
    }

    /// Replaces the orchestrator settings.
    pub fn with_payroll_settings(mut self, payroll: PayrollSettings) -> Self {
        self.payroll = payroll;
        self
    }

    /// Returns the regime table in force for a financial year, i.e. the one
    /// with the latest `effective_from_fy` not after `fy_start_year`.
    pub fn tax_regime_for(&self, regime: TaxRegime, fy_start_year: i32) -> Option<&TaxRegimeConfig> {
        self.income_tax
            .regimes
            .iter()
            .filter(|r| r.regime == regime && r.effective_from_fy <= fy_start_year)
            .max_by_key(|r| r.effective_from_fy)
    }
}
