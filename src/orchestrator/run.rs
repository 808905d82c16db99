//! Run-level operations: start, cancel, revert, recalculate and report.

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    LoanDeductionStatus, PayrollPeriod, PayrollRecord, PayrollRun, PayrollRunPatch, RecordStatus,
    RunCounters, RunStage, RunStatus, RunSummary, RunTotals,
};
use crate::ports::StoreError;

use super::{PayrollOrchestrator, with_retry};

impl PayrollOrchestrator {
    /// Starts and runs payroll for a month.
    ///
    /// Fails without writing anything if the period is invalid, its
    /// attendance is not locked, or a non-reverted run already covers it.
    /// Otherwise every employee is processed and the run finishes
    /// `Completed`, or `Failed` if it was cancelled or hit a run-level error.
    pub async fn start_run(&self, month: u32, year: i32) -> EngineResult<RunSummary> {
        let period = PayrollPeriod::new(month, year)?;
        let retry = self.config.payroll().retry;

        let lock = with_retry(&retry, "get_attendance_lock", move || {
            self.payroll.get_attendance_lock(period)
        })
        .await?;
        if !lock.is_some_and(|l| l.permits_payroll()) {
            return Err(EngineError::AttendanceNotLocked { month, year });
        }

        if let Some(existing) = self.active_run(period).await? {
            return Err(EngineError::DuplicateRun {
                month,
                year,
                existing_run_id: existing.id,
            });
        }

        let run = PayrollRun::new(period, Utc::now());
        let created = with_retry(&retry, "create_payroll_run", || {
            self.payroll.create_payroll_run(run.clone())
        })
        .await;
        match created {
            Ok(()) => {}
            Err(EngineError::Storage(StoreError::Conflict { .. })) => {
                let existing_run_id = self
                    .active_run(period)
                    .await?
                    .map(|r| r.id)
                    .unwrap_or_default();
                return Err(EngineError::DuplicateRun {
                    month,
                    year,
                    existing_run_id,
                });
            }
            Err(e) => return Err(e),
        }

        info!(run_id = %run.id, month, year, "Payroll run created");
        self.execute(run).await
    }

    async fn active_run(&self, period: PayrollPeriod) -> EngineResult<Option<PayrollRun>> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "find_active_run", move || self.payroll.find_active_run(period)).await
    }

    async fn execute(&self, run: PayrollRun) -> EngineResult<RunSummary> {
        let run_id = run.id.as_str();
        let period = run.period;

        let processing = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    status: Some(RunStatus::Processing),
                    stage: Some(RunStage::LoadingEmployees),
                    ..Default::default()
                },
            )
            .await;
        if let Err(e) = processing {
            return Err(self.abandon_run(run_id, e).await);
        }

        let retry = self.config.payroll().retry;
        let employees = match with_retry(&retry, "list_payroll_employees", move || {
            self.payroll.list_payroll_employees(period)
        })
        .await
        {
            Ok(employees) => employees,
            Err(e) => return Err(self.fail_run(run_id, e).await),
        };

        let mut counters = RunCounters {
            total: u32::try_from(employees.len()).unwrap_or(u32::MAX),
            ..Default::default()
        };
        let mut totals = RunTotals::default();

        let started = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    stage: Some(RunStage::CalculatingEmployees),
                    counters: Some(counters),
                    ..Default::default()
                },
            )
            .await;
        if let Err(e) = started {
            return Err(self.fail_run(run_id, e).await);
        }

        info!(
            run_id,
            month = period.month,
            year = period.year,
            total = counters.total,
            "Processing payroll run"
        );

        let chunk_size = self.config.payroll().max_concurrency.max(1);
        for chunk in employees.chunks(chunk_size) {
            match self.cancelled(run_id).await {
                Ok(Some(summary)) => return Ok(summary),
                Ok(None) => {}
                Err(e) => return Err(self.fail_run(run_id, e).await),
            }

            let records = join_all(
                chunk
                    .iter()
                    .map(|employee| self.process_employee(run_id, period, employee, None)),
            )
            .await;

            for record in &records {
                counters.processed += 1;
                if record.status == RecordStatus::Error {
                    counters.error += 1;
                } else {
                    counters.success += 1;
                }
                totals.add(record);
            }

            let progress = self
                .patch_run(
                    run_id,
                    PayrollRunPatch {
                        counters: Some(counters),
                        totals: Some(totals),
                        ..Default::default()
                    },
                )
                .await;
            if let Err(e) = progress {
                return Err(self.fail_run(run_id, e).await);
            }
        }

        match self.cancelled(run_id).await {
            Ok(Some(summary)) => return Ok(summary),
            Ok(None) => {}
            Err(e) => return Err(self.fail_run(run_id, e).await),
        }

        let finished = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    status: Some(RunStatus::Completed),
                    stage: Some(RunStage::Finalized),
                    counters: Some(counters),
                    totals: Some(totals),
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await;
        let run = match finished {
            Ok(run) => run,
            // Cancelled after the last check; the store refused to complete it.
            Err(e @ EngineError::Storage(StoreError::Conflict { .. })) => {
                return match self.cancelled(run_id).await {
                    Ok(Some(summary)) => Ok(summary),
                    Ok(None) => Err(e),
                    Err(other) => Err(other),
                };
            }
            Err(e) => return Err(self.fail_run(run_id, e).await),
        };

        info!(
            run_id,
            total = counters.total,
            success = counters.success,
            error = counters.error,
            net_pay = %totals.net_pay,
            "Payroll run completed"
        );

        let summary = RunSummary::from(&run);
        self.notify_finished(&summary).await;
        Ok(summary)
    }

    /// Returns the run's summary if it was cancelled while processing.
    async fn cancelled(&self, run_id: &str) -> EngineResult<Option<RunSummary>> {
        let run = self.load_run(run_id).await?;
        if run.status != RunStatus::Failed {
            return Ok(None);
        }

        warn!(
            run_id,
            reason = run.failure_reason.as_deref().unwrap_or("cancelled"),
            processed = run.counters.processed,
            "Payroll run cancelled"
        );
        let run = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    stage: Some(RunStage::Finalized),
                    ..Default::default()
                },
            )
            .await?;
        let summary = RunSummary::from(&run);
        self.notify_finished(&summary).await;
        Ok(Some(summary))
    }

    /// Marks the run failed and hands back the causing error.
    async fn fail_run(&self, run_id: &str, cause: EngineError) -> EngineError {
        warn!(run_id, error = %cause, "Payroll run failed");
        let patch = PayrollRunPatch {
            status: Some(RunStatus::Failed),
            stage: Some(RunStage::Finalized),
            failure_reason: Some(cause.to_string()),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        match self.patch_run(run_id, patch).await {
            Ok(run) => self.notify_finished(&RunSummary::from(&run)).await,
            Err(e) => warn!(run_id, error = %e, "Could not mark payroll run failed"),
        }
        cause
    }

    /// Releases the period held by a run that never reached `Processing`.
    ///
    /// The run is marked reverted with the cause recorded. If even that
    /// write fails, `revert_run` can release the run later.
    async fn abandon_run(&self, run_id: &str, cause: EngineError) -> EngineError {
        warn!(run_id, error = %cause, "Payroll run could not start");
        let patch = PayrollRunPatch {
            stage: Some(RunStage::Finalized),
            failure_reason: Some(cause.to_string()),
            reverted: Some(true),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.patch_run(run_id, patch).await {
            warn!(run_id, error = %e, "Could not release payroll run");
        }
        cause
    }

    async fn patch_run(&self, run_id: &str, patch: PayrollRunPatch) -> EngineResult<PayrollRun> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "update_payroll_run", || {
            self.payroll.update_payroll_run(run_id, patch.clone())
        })
        .await
    }

    async fn notify_finished(&self, summary: &RunSummary) {
        if let Err(e) = self.notifier.run_finished(summary).await {
            warn!(run_id = %summary.run_id, error = %e, "Run notification failed");
        }
    }

    /// Returns a run's current summary.
    pub async fn run_summary(&self, run_id: &str) -> EngineResult<RunSummary> {
        Ok(RunSummary::from(&self.load_run(run_id).await?))
    }

    /// Flags a processing run as failed. The run loop stops at its next
    /// chunk boundary; units already started still finish.
    pub async fn cancel_run(&self, run_id: &str, reason: &str) -> EngineResult<RunSummary> {
        let run = self.load_run(run_id).await?;
        if run.reverted || !run.status.can_transition_to(RunStatus::Failed) {
            return Err(EngineError::InvalidTransition {
                entity: "payroll_run",
                from: run.status.as_str().to_string(),
                to: RunStatus::Failed.as_str().to_string(),
            });
        }

        let run = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    status: Some(RunStatus::Failed),
                    failure_reason: Some(format!("cancelled: {}", reason)),
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        info!(run_id, reason, "Payroll run cancellation requested");
        Ok(RunSummary::from(&run))
    }

    /// Undoes a finished run: hands back its loan installments, deletes its
    /// records and frees its period for a new run. A run left `Pending` by a
    /// start that failed can be reverted too.
    ///
    /// Refused while the run is processing, once it is reverted, or if any
    /// of its records has been paid.
    pub async fn revert_run(&self, run_id: &str) -> EngineResult<RunSummary> {
        let run = self.load_run(run_id).await?;
        let revertible = matches!(
            run.status,
            RunStatus::Pending | RunStatus::Completed | RunStatus::Failed
        );
        if run.reverted || !revertible {
            return Err(EngineError::InvalidTransition {
                entity: "payroll_run",
                from: if run.reverted {
                    "reverted".to_string()
                } else {
                    run.status.as_str().to_string()
                },
                to: "reverted".to_string(),
            });
        }

        let records = self.list_records(run_id).await?;
        if let Some(paid) = records.iter().find(|r| r.status == RecordStatus::Paid) {
            return Err(EngineError::RecordLocked {
                employee_id: paid.employee_id.clone(),
                status: paid.status.as_str().to_string(),
            });
        }

        let mut updates = Vec::new();
        for record in records.iter().filter(|r| has_loan_activity(r)) {
            updates.extend(self.release_deductions(run_id, run.period, record).await?);
        }
        let released = updates.len();

        let retry = self.config.payroll().retry;
        if !updates.is_empty() {
            with_retry(&retry, "apply_loan_updates", || {
                self.loans.apply_loan_updates(updates.clone())
            })
            .await?;
        }
        let deleted = with_retry(&retry, "delete_payroll_records", move || {
            self.payroll.delete_payroll_records(run_id)
        })
        .await?;
        let run = self
            .patch_run(
                run_id,
                PayrollRunPatch {
                    reverted: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            run_id,
            records = deleted,
            installments = released,
            "Payroll run reverted"
        );
        Ok(RunSummary::from(&run))
    }

    /// Recomputes one employee's record in a completed run.
    ///
    /// Recomputing is idempotent: installments this run already recovered
    /// stay recovered, skipped ones are decided again. Verified and paid
    /// records are refused. Run counters and totals are rebuilt afterwards.
    pub async fn recalculate_employee(
        &self,
        run_id: &str,
        employee_id: &str,
    ) -> EngineResult<PayrollRecord> {
        let run = self.load_run(run_id).await?;
        if run.reverted || run.status != RunStatus::Completed {
            return Err(EngineError::RunNotCompleted {
                run_id: run_id.to_string(),
                status: if run.reverted {
                    "reverted".to_string()
                } else {
                    run.status.as_str().to_string()
                },
            });
        }

        let retry = self.config.payroll().retry;
        let prior = with_retry(&retry, "get_payroll_record", move || {
            self.payroll.get_payroll_record(run_id, employee_id)
        })
        .await?;
        if let Some(prior) = &prior {
            if !prior.status.is_recomputable() {
                return Err(EngineError::RecordLocked {
                    employee_id: employee_id.to_string(),
                    status: prior.status.as_str().to_string(),
                });
            }
        }

        let employee = with_retry(&retry, "get_payroll_employee", move || {
            self.payroll.get_payroll_employee(employee_id)
        })
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "employee",
            id: employee_id.to_string(),
        })?;

        let record = self
            .process_employee(run_id, run.period, &employee, prior.as_ref())
            .await;

        let records = self.list_records(run_id).await?;
        let mut counters = RunCounters {
            total: run.counters.total.max(u32::try_from(records.len()).unwrap_or(u32::MAX)),
            ..Default::default()
        };
        let mut totals = RunTotals::default();
        for r in &records {
            counters.processed += 1;
            if r.status == RecordStatus::Error {
                counters.error += 1;
            } else {
                counters.success += 1;
            }
            totals.add(r);
        }
        self.patch_run(
            run_id,
            PayrollRunPatch {
                counters: Some(counters),
                totals: Some(totals),
                ..Default::default()
            },
        )
        .await?;

        info!(
            run_id,
            employee_id,
            status = record.status.as_str(),
            "Employee payroll recalculated"
        );
        Ok(record)
    }
}

fn has_loan_activity(record: &PayrollRecord) -> bool {
    record
        .loan_deductions
        .iter()
        .any(|a| a.status != LoanDeductionStatus::Scheduled)
}
