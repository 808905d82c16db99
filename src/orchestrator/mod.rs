//! Payroll run orchestration.
//!
//! The [`PayrollOrchestrator`] drives a month's payroll over the storage
//! ports: it checks run preconditions, calculates each employee as an
//! isolated unit, aggregates the results and finalizes the run. It also
//! owns the post-run operations: recalculating an employee, verifying and
//! paying records, and reverting or cancelling a run.
//!
//! Units run in chunks of `max_concurrency` and are joined before the next
//! chunk starts. Only the run loop writes counters and totals, and a run
//! cancelled from outside stops at the next chunk boundary.

mod employee;
mod retry;
mod run;

use std::sync::Arc;

use tracing::info;

use crate::config::StatutoryConfig;
use crate::error::{EngineError, EngineResult};
use crate::export::{FilingExport, FilingKind, generate_ecr, generate_esi_contribution};
use crate::models::{PayrollRecord, PayrollRun, RecordStatus};
use crate::ports::{LoanStore, Notifier, PayrollStore, StoreError};

pub use retry::with_retry;

/// Runs payroll against injected ports.
#[derive(Clone)]
pub struct PayrollOrchestrator {
    payroll: Arc<dyn PayrollStore>,
    loans: Arc<dyn LoanStore>,
    notifier: Arc<dyn Notifier>,
    config: Arc<StatutoryConfig>,
}

impl PayrollOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        payroll: Arc<dyn PayrollStore>,
        loans: Arc<dyn LoanStore>,
        notifier: Arc<dyn Notifier>,
        config: Arc<StatutoryConfig>,
    ) -> Self {
        Self {
            payroll,
            loans,
            notifier,
            config,
        }
    }

    /// Returns the statutory configuration in use.
    pub fn config(&self) -> &StatutoryConfig {
        &self.config
    }

    async fn load_run(&self, run_id: &str) -> EngineResult<PayrollRun> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "get_payroll_run", move || self.payroll.get_payroll_run(run_id))
            .await?
            .ok_or_else(|| {
                StoreError::NotFound {
                    entity: "payroll_run",
                    id: run_id.to_string(),
                }
                .into()
            })
    }

    async fn load_record(&self, run_id: &str, employee_id: &str) -> EngineResult<PayrollRecord> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "get_payroll_record", move || {
            self.payroll.get_payroll_record(run_id, employee_id)
        })
        .await?
        .ok_or_else(|| {
            StoreError::NotFound {
                entity: "payroll_record",
                id: format!("{}/{}", run_id, employee_id),
            }
            .into()
        })
    }

    /// Lists a run's records.
    pub async fn list_records(&self, run_id: &str) -> EngineResult<Vec<PayrollRecord>> {
        self.load_run(run_id).await?;
        let retry = self.config.payroll().retry;
        with_retry(&retry, "list_payroll_records", move || {
            self.payroll.list_payroll_records(run_id)
        })
        .await
    }

    /// Renders a statutory filing for a completed run.
    pub async fn filing(&self, run_id: &str, kind: FilingKind) -> EngineResult<FilingExport> {
        let run = self.load_run(run_id).await?;
        let records = self.list_records(run_id).await?;
        let retry = self.config.payroll().retry;
        let period = run.period;
        let employees = with_retry(&retry, "list_payroll_employees", move || {
            self.payroll.list_payroll_employees(period)
        })
        .await?;

        let establishment = self.config.establishment();
        let export = match kind {
            FilingKind::Ecr => generate_ecr(establishment, &run, &records, &employees)?,
            FilingKind::EsiContribution => {
                generate_esi_contribution(establishment, &run, &records, &employees)?
            }
        };

        info!(
            run_id,
            kind = ?kind,
            employees = export.employee_count,
            error_records = export.error_records,
            missing_identifier = export.missing_identifier.len(),
            "Filing exported"
        );
        Ok(export)
    }

    /// Marks a calculated record as verified. Verified records are frozen.
    pub async fn verify_record(&self, run_id: &str, employee_id: &str) -> EngineResult<PayrollRecord> {
        self.advance_record(run_id, employee_id, RecordStatus::Verified).await
    }

    /// Marks a verified record as paid.
    pub async fn mark_record_paid(&self, run_id: &str, employee_id: &str) -> EngineResult<PayrollRecord> {
        self.advance_record(run_id, employee_id, RecordStatus::Paid).await
    }

    async fn advance_record(
        &self,
        run_id: &str,
        employee_id: &str,
        to: RecordStatus,
    ) -> EngineResult<PayrollRecord> {
        let record = self.load_record(run_id, employee_id).await?;
        let from = record.status;
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                entity: "payroll_record",
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let retry = self.config.payroll().retry;
        let updated = with_retry(&retry, "set_record_status", move || {
            self.payroll.set_record_status(run_id, employee_id, from, to)
        })
        .await?;

        info!(
            run_id,
            employee_id,
            status = to.as_str(),
            "Payroll record status changed"
        );
        Ok(updated)
    }
}
