//! Statutory deadline tracking.
//!
//! Due dates come from the configured rules ([`due_date`]); the
//! [`DeadlineTracker`] stores one deadline per obligation and month and
//! raises 7, 3 and 1-day reminders plus a single overdue alert. Each
//! threshold fires at most once, guarded by a persisted flag.

mod schedule;
mod tracker;

pub use schedule::{applies_to, due_date};
pub use tracker::DeadlineTracker;
