//! Statutory calculations for the Payroll Engine.
//!
//! Each calculator is a pure function over an amount, its configuration and
//! the payroll period, returning the computed amounts together with an
//! [`AuditStep`](crate::models::AuditStep) explaining them. Attendance
//! proration turns a salary structure into the month's earnings; Provident
//! Fund, ESI, professional tax and income tax are then derived from those
//! earnings.

mod esi;
mod income_tax;
mod professional_tax;
mod proration;
mod provident_fund;

pub use esi::{EsiContribution, EsiResult, calculate_esi};
pub use income_tax::{AnnualTax, TdsResult, annual_tax, calculate_tds, slab_tax};
pub use professional_tax::{ProfessionalTaxResult, calculate_professional_tax};
pub use proration::{ProrationResult, prorate_salary};
pub use provident_fund::{ProvidentFundContribution, ProvidentFundResult, calculate_provident_fund};
