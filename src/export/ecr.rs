//! PF electronic challan-cum-return (ECR).

use crate::config::Establishment;
use crate::error::EngineResult;
use crate::models::{PayrollEmployee, PayrollRecord, PayrollRun};
use crate::money::Paise;

use super::{FilingExport, FilingKind, clean, ensure_completed, exportable, line, render};

/// Renders the ECR for a completed run.
///
/// The header carries the establishment, the month, the member count and
/// totals of EPF wages, employee contributions and the employer share
/// (EPF + EPS). Each member line has twelve fields: UAN, name, gross wages,
/// EPF, EPS and EDLI wages, the employee contribution, the EPS
/// contribution, the EPF-EPS difference, the EDLI contribution, NCP days
/// and refunds.
///
/// Employees not enrolled in PF are not members and are skipped.
pub fn generate_ecr(
    establishment: &Establishment,
    run: &PayrollRun,
    records: &[PayrollRecord],
    employees: &[PayrollEmployee],
) -> EngineResult<FilingExport> {
    ensure_completed(run)?;

    let (rows, error_records) = exportable(records, employees);

    let mut missing_identifier = Vec::new();
    let mut lines = Vec::with_capacity(rows.len());
    let mut total_wages = Paise::ZERO;
    let mut total_employee = Paise::ZERO;
    let mut total_employer = Paise::ZERO;

    for (record, employee) in rows {
        let Some(employee) = employee else {
            missing_identifier.push(record.employee_id.clone());
            continue;
        };
        if !employee.pf_enrolled {
            continue;
        }
        let Some(uan) = employee.uan() else {
            missing_identifier.push(record.employee_id.clone());
            continue;
        };

        let pf = &record.provident_fund;
        total_wages += pf.wages;
        total_employee += pf.employee;
        total_employer += pf.employer_share();

        lines.push(line(&[
            uan.to_string(),
            clean(&employee.name),
            record.gross_earnings.to_rupees_string(),
            pf.wages.to_rupees_string(),
            pf.wages.to_rupees_string(),
            pf.wages.to_rupees_string(),
            pf.employee.to_rupees_string(),
            pf.employer_eps.to_rupees_string(),
            pf.employer_epf.to_rupees_string(),
            pf.employer_edli.to_rupees_string(),
            record.ncp_days().to_string(),
            Paise::ZERO.to_rupees_string(),
        ]));
    }

    let header = line(&[
        clean(&establishment.code),
        clean(&establishment.name),
        format!("{:02}", run.period.month),
        run.period.year.to_string(),
        lines.len().to_string(),
        total_wages.to_rupees_string(),
        total_employee.to_rupees_string(),
        total_employer.to_rupees_string(),
    ]);

    Ok(FilingExport {
        kind: FilingKind::Ecr,
        employee_count: lines.len(),
        content: render(header, lines),
        error_records,
        missing_identifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{EsiContribution, ProvidentFundContribution};
    use crate::export::test_support::*;
    use crate::models::RecordStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn establishment() -> Establishment {
        Establishment {
            code: "MHBAN0012345000".to_string(),
            name: "ACME TECHNOLOGIES PRIVATE LIMITED".to_string(),
            esi_employer_code: "31000123450000999".to_string(),
        }
    }

    /// ₹25,000 basic: wages capped at ₹15,000, EPS capped at ₹1,250
    fn capped_pf() -> ProvidentFundContribution {
        ProvidentFundContribution {
            wages: Paise::from_rupees(15_000),
            employee: Paise::from_rupees(1_800),
            employer_epf: Paise::from_rupees(550),
            employer_eps: Paise::from_rupees(1_250),
            employer_edli: Paise::from_rupees(75),
            admin_charges: Paise::new(7_650),
        }
    }

    /// ECR-001: header and member line layout
    #[test]
    fn test_ecr_layout() {
        let run = completed_run();
        let records = vec![record(
            &run,
            "emp_001",
            Paise::from_rupees(45_000),
            capped_pf(),
            EsiContribution::default(),
            dec("1.5"),
        )];
        let employees = vec![employee("emp_001", Some("100100000001"), None)];

        let export = generate_ecr(&establishment(), &run, &records, &employees).unwrap();

        let lines: Vec<&str> = export.content.lines().collect();
        assert_eq!(
            lines[0],
            "MHBAN0012345000#~#ACME TECHNOLOGIES PRIVATE LIMITED#~#04#~#2025#~#1#~#15000.00#~#1800.00#~#1800.00"
        );
        assert_eq!(
            lines[1],
            "100100000001#~#Name emp_001#~#45000.00#~#15000.00#~#15000.00#~#15000.00#~#1800.00#~#1250.00#~#550.00#~#75.00#~#2#~#0.00"
        );
        assert_eq!(lines[1].split("#~#").count(), 12);
        assert_eq!(export.employee_count, 1);
    }

    /// ECR-002: missing UAN and error records are left out and reported
    #[test]
    fn test_ecr_exclusions() {
        let run = completed_run();
        let mut failed = record(
            &run,
            "emp_003",
            Paise::ZERO,
            ProvidentFundContribution::default(),
            EsiContribution::default(),
            Decimal::ZERO,
        );
        failed.status = RecordStatus::Error;
        let records = vec![
            record(
                &run,
                "emp_001",
                Paise::from_rupees(45_000),
                capped_pf(),
                EsiContribution::default(),
                Decimal::ZERO,
            ),
            record(
                &run,
                "emp_002",
                Paise::from_rupees(45_000),
                capped_pf(),
                EsiContribution::default(),
                Decimal::ZERO,
            ),
            failed,
        ];
        let employees = vec![
            employee("emp_001", Some("100100000001"), None),
            employee("emp_002", Some("  "), None),
            employee("emp_003", Some("100100000003"), None),
        ];

        let export = generate_ecr(&establishment(), &run, &records, &employees).unwrap();

        assert_eq!(export.employee_count, 1);
        assert_eq!(export.error_records, 1);
        assert_eq!(export.missing_identifier, vec!["emp_002".to_string()]);
        assert_eq!(export.content.lines().count(), 2);
    }

    #[test]
    fn test_non_members_are_skipped_silently() {
        let run = completed_run();
        let records = vec![record(
            &run,
            "emp_001",
            Paise::from_rupees(45_000),
            ProvidentFundContribution::default(),
            EsiContribution::default(),
            Decimal::ZERO,
        )];
        let mut opted_out = employee("emp_001", None, None);
        opted_out.pf_enrolled = false;

        let export = generate_ecr(&establishment(), &run, &records, &[opted_out]).unwrap();

        assert_eq!(export.employee_count, 0);
        assert!(export.missing_identifier.is_empty());
        assert!(export.content.ends_with("#~#0#~#0.00#~#0.00#~#0.00\n"));
    }

    #[test]
    fn test_processing_run_is_refused() {
        let mut run = PayrollRun::new(period(), Utc::now());
        run.status = crate::models::RunStatus::Processing;
        assert!(generate_ecr(&establishment(), &run, &[], &[]).is_err());
    }
}
