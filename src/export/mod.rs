//! Statutory filing exporters.
//!
//! Exporters turn a completed run's records into the `#~#`-separated text
//! files accepted by the PF and ESI portals. They are pure: callers load the
//! run, its records and the employee projections and hand them over.
//!
//! `Error` records are never exported and are only counted. Employees
//! without the identifier a filing needs (UAN for PF, IP number for ESI)
//! are left out and reported by id so HR can fix the master data.

mod ecr;
mod esi;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{PayrollEmployee, PayrollRecord, PayrollRun, RecordStatus, RunStatus};

pub use ecr::generate_ecr;
pub use esi::generate_esi_contribution;

/// Field separator used by the filing portals.
pub const FIELD_SEPARATOR: &str = "#~#";

/// Which filing a [`FilingExport`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingKind {
    /// PF electronic challan-cum-return.
    Ecr,
    /// ESI monthly contribution file.
    EsiContribution,
}

/// A rendered filing and what was left out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingExport {
    /// The filing.
    pub kind: FilingKind,
    /// File content: a header line then one line per employee.
    pub content: String,
    /// Employees written to the file.
    pub employee_count: usize,
    /// `Error` records not exported.
    pub error_records: usize,
    /// Employees excluded for a missing identifier.
    pub missing_identifier: Vec<String>,
}

fn ensure_completed(run: &PayrollRun) -> EngineResult<()> {
    if run.status != RunStatus::Completed || run.reverted {
        return Err(EngineError::RunNotCompleted {
            run_id: run.id.clone(),
            status: if run.reverted {
                "reverted".to_string()
            } else {
                run.status.as_str().to_string()
            },
        });
    }
    Ok(())
}

/// Splits a run's records into exportable ones, paired with their employee,
/// and the number of `Error` records.
fn exportable<'a>(
    records: &'a [PayrollRecord],
    employees: &'a [PayrollEmployee],
) -> (Vec<(&'a PayrollRecord, Option<&'a PayrollEmployee>)>, usize) {
    let by_id: HashMap<&str, &PayrollEmployee> =
        employees.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut errors = 0;
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        if record.status == RecordStatus::Error {
            errors += 1;
            continue;
        }
        rows.push((record, by_id.get(record.employee_id.as_str()).copied()));
    }
    rows.sort_by(|(a, _), (b, _)| a.employee_id.cmp(&b.employee_id));
    (rows, errors)
}

fn line(fields: &[String]) -> String {
    fields.join(FIELD_SEPARATOR)
}

/// Strips separators and line breaks out of free text such as names.
fn clean(text: &str) -> String {
    text.replace(FIELD_SEPARATOR, " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

fn render(header: String, lines: Vec<String>) -> String {
    let mut content = header;
    content.push('\n');
    for l in lines {
        content.push_str(&l);
        content.push('\n');
    }
    content
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_pending_run_is_refused() {
        let run = PayrollRun::new(period(), Utc::now());
        match ensure_completed(&run) {
            Err(EngineError::RunNotCompleted { status, .. }) => assert_eq!(status, "pending"),
            other => panic!("Expected RunNotCompleted, got {:?}", other),
        }
    }

    #[test]
    fn test_reverted_run_is_refused() {
        let mut run = completed_run();
        run.reverted = true;
        assert!(ensure_completed(&run).is_err());
    }

    #[test]
    fn test_clean_removes_separators() {
        assert_eq!(clean(" A#~#B\nC "), "A B C");
    }
}
