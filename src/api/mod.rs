//! HTTP API for the Payroll Engine.
//!
//! A thin axum adapter over [`PayrollOrchestrator`](crate::orchestrator::PayrollOrchestrator):
//! start a run, read its summary and records, revert it, and download the
//! PF and ESI filings.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{CancelRunRequest, StartRunRequest};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
