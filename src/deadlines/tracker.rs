//! Deadline generation, alerting and filing.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::StatutoryConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AlertThreshold, DeadlineAlert, DeadlineStatus, DeadlineType, PayrollPeriod, StatutoryDeadline,
};
use crate::orchestrator::with_retry;
use crate::ports::{DeadlineStore, Notifier, StoreError};

use super::schedule::due_date;

/// Keeps statutory deadlines up to date and raises their alerts.
#[derive(Clone)]
pub struct DeadlineTracker {
    store: Arc<dyn DeadlineStore>,
    notifier: Arc<dyn Notifier>,
    config: Arc<StatutoryConfig>,
}

impl DeadlineTracker {
    /// Creates a tracker.
    pub fn new(
        store: Arc<dyn DeadlineStore>,
        notifier: Arc<dyn Notifier>,
        config: Arc<StatutoryConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Creates or refreshes the period's deadlines, one per applicable rule.
    ///
    /// Safe to call repeatedly: existing rows keep their status and alert
    /// flags.
    pub async fn generate_deadlines(
        &self,
        period: PayrollPeriod,
    ) -> EngineResult<Vec<StatutoryDeadline>> {
        let retry = self.config.payroll().retry;
        let mut deadlines = Vec::new();

        for rule in &self.config.deadlines().rules {
            let Some(due) = due_date(rule, period) else {
                continue;
            };
            let deadline = StatutoryDeadline::new(rule.deadline_type, period, due);
            let stored = with_retry(&retry, "upsert_deadline", || {
                self.store.upsert_deadline(deadline.clone())
            })
            .await?;
            deadlines.push(stored);
        }

        info!(
            month = period.month,
            year = period.year,
            count = deadlines.len(),
            "Statutory deadlines generated"
        );
        Ok(deadlines)
    }

    /// Raises the alerts due on `today` and returns them.
    ///
    /// Each open deadline fires at most its most urgent unsent threshold.
    /// Passing the due date moves the deadline to `Overdue`. Flags are
    /// persisted before the notifier is called, so a failed delivery is
    /// logged and not repeated.
    pub async fn evaluate_alerts(&self, today: NaiveDate) -> EngineResult<Vec<DeadlineAlert>> {
        let retry = self.config.payroll().retry;
        let open = with_retry(&retry, "list_open_deadlines", || {
            self.store.list_open_deadlines()
        })
        .await?;

        let mut alerts = Vec::new();
        for mut deadline in open {
            let days_remaining = (deadline.due_date - today).num_days();
            let Some(threshold) = AlertThreshold::for_days_remaining(days_remaining) else {
                continue;
            };

            let becomes_overdue =
                threshold == AlertThreshold::Overdue && deadline.status != DeadlineStatus::Overdue;
            let fires = !deadline.alert_sent(threshold);
            if !fires && !becomes_overdue {
                continue;
            }

            if becomes_overdue {
                deadline.status = DeadlineStatus::Overdue;
            }
            if fires {
                deadline.mark_alert_sent(threshold);
            }
            with_retry(&retry, "update_deadline", || {
                self.store.update_deadline(deadline.clone())
            })
            .await?;

            if !fires {
                continue;
            }
            let alert = DeadlineAlert {
                deadline_type: deadline.deadline_type,
                period: deadline.period,
                due_date: deadline.due_date,
                threshold,
                days_remaining,
            };
            info!(
                deadline_type = alert.deadline_type.as_str(),
                due_date = %alert.due_date,
                threshold = ?alert.threshold,
                days_remaining,
                "Deadline alert raised"
            );
            if let Err(e) = self.notifier.deadline_alert(&alert).await {
                warn!(
                    deadline_type = alert.deadline_type.as_str(),
                    error = %e,
                    "Deadline alert delivery failed"
                );
            }
            alerts.push(alert);
        }

        Ok(alerts)
    }

    /// Records a deadline as filed.
    pub async fn mark_filed(
        &self,
        deadline_type: DeadlineType,
        period: PayrollPeriod,
        filed_on: NaiveDate,
    ) -> EngineResult<StatutoryDeadline> {
        let retry = self.config.payroll().retry;
        let mut deadline = with_retry(&retry, "get_deadline", || {
            self.store.get_deadline(deadline_type, period)
        })
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "deadline",
            id: format!("{}/{}", deadline_type.as_str(), period),
        })?;

        if deadline.status == DeadlineStatus::Filed {
            return Err(EngineError::InvalidTransition {
                entity: "deadline",
                from: deadline.status.as_str().to_string(),
                to: DeadlineStatus::Filed.as_str().to_string(),
            });
        }

        deadline.status = DeadlineStatus::Filed;
        deadline.filed_on = Some(filed_on);
        with_retry(&retry, "update_deadline", || {
            self.store.update_deadline(deadline.clone())
        })
        .await?;

        info!(
            deadline_type = deadline_type.as_str(),
            month = period.month,
            year = period.year,
            %filed_on,
            "Deadline filed"
        );
        Ok(deadline)
    }
}
