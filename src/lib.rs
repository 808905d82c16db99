//! Payroll Engine for Indian statutory payroll
//!
//! This crate runs monthly payroll over locked attendance: it prorates each
//! employee's salary structure, computes Provident Fund, ESI, professional
//! tax and income-tax withholding, recovers loan installments, and produces
//! the PF ECR and ESI contribution filings. Statutory deadlines are tracked
//! with escalating reminders.
//!
//! Storage and notifications sit behind the traits in [`ports`]; the
//! [`orchestrator`] drives a run against whatever implementations it is
//! given, and [`api`] exposes it over HTTP.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod deadlines;
pub mod error;
pub mod export;
pub mod loans;
pub mod models;
pub mod money;
pub mod orchestrator;
pub mod ports;
pub mod store;
