//! Statutory deadline models.
//!
//! One [`StatutoryDeadline`] exists per (type, month, year). Alert thresholds
//! are tracked with persisted flags so each fires at most once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PayrollPeriod;

/// The statutory obligation a deadline belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    /// Monthly PF electronic challan-cum-return.
    PfEcr,
    /// Monthly ESI contribution.
    EsiContribution,
    /// Monthly professional tax remittance.
    ProfessionalTax,
    /// Monthly TDS deposit.
    TdsDeposit,
    /// Quarterly TDS return (Form 24Q).
    TdsQuarterlyReturn,
    /// Annual Form 16 issue to employees.
    Form16,
}

impl DeadlineType {
    /// Returns the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineType::PfEcr => "pf_ecr",
            DeadlineType::EsiContribution => "esi_contribution",
            DeadlineType::ProfessionalTax => "professional_tax",
            DeadlineType::TdsDeposit => "tds_deposit",
            DeadlineType::TdsQuarterlyReturn => "tds_quarterly_return",
            DeadlineType::Form16 => "form16",
        }
    }
}

/// Filing status of a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    /// Not yet filed, not yet due.
    Pending,
    /// Filed.
    Filed,
    /// Past due and not filed.
    Overdue,
}

impl DeadlineStatus {
    /// Returns the status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineStatus::Pending => "pending",
            DeadlineStatus::Filed => "filed",
            DeadlineStatus::Overdue => "overdue",
        }
    }
}

/// An alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertThreshold {
    /// Seven days before the due date.
    SevenDays,
    /// Three days before the due date.
    ThreeDays,
    /// One day before the due date.
    OneDay,
    /// The due date has passed.
    Overdue,
}

impl AlertThreshold {
    /// Returns the most urgent reminder threshold reached `days_remaining`
    /// days before the due date, or `None` if no reminder is due yet.
    /// Negative values are overdue.
    pub fn for_days_remaining(days_remaining: i64) -> Option<Self> {
        match days_remaining {
            d if d < 0 => Some(AlertThreshold::Overdue),
            0..=1 => Some(AlertThreshold::OneDay),
            2..=3 => Some(AlertThreshold::ThreeDays),
            4..=7 => Some(AlertThreshold::SevenDays),
            _ => None,
        }
    }
}

/// A statutory filing deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryDeadline {
    /// The obligation.
    pub deadline_type: DeadlineType,
    /// The payroll month the obligation arises from.
    pub period: PayrollPeriod,
    /// The due date.
    pub due_date: NaiveDate,
    /// Filing status.
    pub status: DeadlineStatus,
    /// The 7-day reminder was sent.
    pub alert_7_day_sent: bool,
    /// The 3-day reminder was sent.
    pub alert_3_day_sent: bool,
    /// The 1-day reminder was sent.
    pub alert_1_day_sent: bool,
    /// The overdue alert was sent.
    pub overdue_alert_sent: bool,
    /// When the obligation was filed.
    #[serde(default)]
    pub filed_on: Option<NaiveDate>,
}

impl StatutoryDeadline {
    /// Creates a pending deadline with no alerts sent.
    pub fn new(deadline_type: DeadlineType, period: PayrollPeriod, due_date: NaiveDate) -> Self {
        Self {
            deadline_type,
            period,
            due_date,
            status: DeadlineStatus::Pending,
            alert_7_day_sent: false,
            alert_3_day_sent: false,
            alert_1_day_sent: false,
            overdue_alert_sent: false,
            filed_on: None,
        }
    }

    /// Returns the upsert key.
    pub fn key(&self) -> (DeadlineType, PayrollPeriod) {
        (self.deadline_type, self.period)
    }

    /// Returns true if the deadline still needs attention.
    pub fn is_open(&self) -> bool {
        self.status != DeadlineStatus::Filed
    }

    /// Returns true if the alert for `threshold` has gone out.
    pub fn alert_sent(&self, threshold: AlertThreshold) -> bool {
        match threshold {
            AlertThreshold::SevenDays => self.alert_7_day_sent,
            AlertThreshold::ThreeDays => self.alert_3_day_sent,
            AlertThreshold::OneDay => self.alert_1_day_sent,
            AlertThreshold::Overdue => self.overdue_alert_sent,
        }
    }

    /// Records the alert for `threshold` as sent, along with every less
    /// urgent reminder so a skipped one never fires late.
    pub fn mark_alert_sent(&mut self, threshold: AlertThreshold) {
        match threshold {
            AlertThreshold::Overdue => {
                self.overdue_alert_sent = true;
                self.alert_1_day_sent = true;
                self.alert_3_day_sent = true;
                self.alert_7_day_sent = true;
            }
            AlertThreshold::OneDay => {
                self.alert_1_day_sent = true;
                self.alert_3_day_sent = true;
                self.alert_7_day_sent = true;
            }
            AlertThreshold::ThreeDays => {
                self.alert_3_day_sent = true;
                self.alert_7_day_sent = true;
            }
            AlertThreshold::SevenDays => self.alert_7_day_sent = true,
        }
    }
}

/// An alert raised for a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineAlert {
    /// The obligation.
    pub deadline_type: DeadlineType,
    /// The payroll month.
    pub period: PayrollPeriod,
    /// The due date.
    pub due_date: NaiveDate,
    /// The threshold that fired.
    pub threshold: AlertThreshold,
    /// Days from the evaluation date to the due date; negative when overdue.
    pub days_remaining: i64,
}
