//! ESI monthly contribution file.

use crate::config::Establishment;
use crate::error::EngineResult;
use crate::models::{PayrollEmployee, PayrollRecord, PayrollRun};
use crate::money::Paise;

use super::{FilingExport, FilingKind, clean, ensure_completed, exportable, line, render};

/// Renders the ESI contribution file for a completed run.
///
/// Only records covered by ESI that month are filed. Each line holds the
/// IP number, name, paid days, wages and the employee and employer
/// contributions.
pub fn generate_esi_contribution(
    establishment: &Establishment,
    run: &PayrollRun,
    records: &[PayrollRecord],
    employees: &[PayrollEmployee],
) -> EngineResult<FilingExport> {
    ensure_completed(run)?;

    let (rows, error_records) = exportable(records, employees);

    let mut missing_identifier = Vec::new();
    let mut lines = Vec::new();
    let mut total_wages = Paise::ZERO;
    let mut total_employee = Paise::ZERO;
    let mut total_employer = Paise::ZERO;

    for (record, employee) in rows.into_iter().filter(|(r, _)| r.esi.covered) {
        let Some((employee, ip_number)) = employee.and_then(|e| e.esi_number().map(|ip| (e, ip)))
        else {
            missing_identifier.push(record.employee_id.clone());
            continue;
        };

        let esi = &record.esi;
        total_wages += esi.wages;
        total_employee += esi.employee;
        total_employer += esi.employer;

        lines.push(line(&[
            ip_number.to_string(),
            clean(&employee.name),
            record.paid_days.normalize().to_string(),
            esi.wages.to_rupees_string(),
            esi.employee.to_rupees_string(),
            esi.employer.to_rupees_string(),
        ]));
    }

    let header = line(&[
        clean(&establishment.esi_employer_code),
        format!("{:02}", run.period.month),
        run.period.year.to_string(),
        lines.len().to_string(),
        total_wages.to_rupees_string(),
        total_employee.to_rupees_string(),
        total_employer.to_rupees_string(),
    ]);

    Ok(FilingExport {
        kind: FilingKind::EsiContribution,
        employee_count: lines.len(),
        content: render(header, lines),
        error_records,
        missing_identifier,
    })
}
