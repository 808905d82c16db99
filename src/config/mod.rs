//! Configuration loading and management for the Payroll Engine.
//!
//! This module loads statutory parameters from YAML files: PF and ESI rates,
//! professional-tax slabs, income-tax regime tables, filing deadline rules
//! and orchestrator settings.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/india").unwrap();
//! println!("PF wage ceiling: {}", config.config().provident_fund().wage_ceiling);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    DeadlineFrequency, DeadlineRule, DeadlinesConfig, EsiConfig, Establishment, IncomeTaxConfig,
    IncomeTaxSlab, InsufficientNetPayPolicy, PayrollSettings, ProfessionalTaxConfig,
    ProfessionalTaxSlab, ProvidentFundConfig, RetryPolicy, StatutoryConfig, TaxRegimeConfig,
    YearEndOverride,
};
