//! Notifier implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::models::{DeadlineAlert, RunSummary};
use crate::ports::{Notifier, StoreError, StoreResult};

/// Writes notifications to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deadline_alert(&self, alert: &DeadlineAlert) -> StoreResult<()> {
        info!(
            deadline_type = alert.deadline_type.as_str(),
            month = alert.period.month,
            year = alert.period.year,
            due_date = %alert.due_date,
            threshold = ?alert.threshold,
            days_remaining = alert.days_remaining,
            "Statutory deadline alert"
        );
        Ok(())
    }

    async fn run_finished(&self, summary: &RunSummary) -> StoreResult<()> {
        info!(
            run_id = %summary.run_id,
            status = summary.status.as_str(),
            total = summary.counters.total,
            success = summary.counters.success,
            error = summary.counters.error,
            "Payroll run finished"
        );
        Ok(())
    }
}

/// Keeps every notification in memory for inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<DeadlineAlert>>,
    runs: Mutex<Vec<RunSummary>>,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the alerts received so far.
    pub fn alerts(&self) -> Vec<DeadlineAlert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Returns the run summaries received so far.
    pub fn runs(&self) -> Vec<RunSummary> {
        self.runs.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("notifier lock poisoned".to_string())
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deadline_alert(&self, alert: &DeadlineAlert) -> StoreResult<()> {
        self.alerts.lock().map_err(|_| poisoned())?.push(alert.clone());
        Ok(())
    }

    async fn run_finished(&self, summary: &RunSummary) -> StoreResult<()> {
        self.runs.lock().map_err(|_| poisoned())?.push(summary.clone());
        Ok(())
    }
}
