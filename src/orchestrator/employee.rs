//! The per-employee calculation unit.
//!
//! A unit reads one employee's inputs, runs the statutory calculators and
//! loan recovery, and persists either a `Calculated` record together with its
//! loan updates or an `Error` record. A failing unit never fails the run.

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::calculation::{
    ProvidentFundContribution, calculate_esi, calculate_professional_tax, calculate_provident_fund,
    calculate_tds, prorate_salary,
};
use crate::error::{EngineError, EngineResult};
use crate::loans::{plan_recovery, revert_deduction};
use crate::models::{
    AuditStep, EmployeeLoan, LoanDeduction, LoanDeductionStatus, LoanDeductionUpdate,
    PayrollEmployee, PayrollPeriod, PayrollRecord, RecordStatus,
};
use crate::ports::StoreError;

use super::{PayrollOrchestrator, with_retry};

impl PayrollOrchestrator {
    /// Runs one unit and returns the record it produced.
    ///
    /// `prior` is the record being replaced, if any. When even the error
    /// record cannot be stored the in-memory error record is still returned so
    /// the run loop counts the employee as failed.
    pub(super) async fn process_employee(
        &self,
        run_id: &str,
        period: PayrollPeriod,
        employee: &PayrollEmployee,
        prior: Option<&PayrollRecord>,
    ) -> PayrollRecord {
        let outcome = match self.compute_employee(run_id, period, employee, prior).await {
            Ok((record, updates)) => match self.store_record(&record, &updates).await {
                Ok(()) => return record,
                Err(e) => e,
            },
            Err(e) => e,
        };

        warn!(
            run_id,
            employee_id = %employee.id,
            error = %outcome,
            kind = ?outcome.kind(),
            "Employee payroll failed"
        );

        let mut record =
            PayrollRecord::error(run_id, &employee.id, period, outcome.to_string(), Utc::now());
        if let Some(prior) = prior {
            record.id = prior.id.clone();
        }

        let released = match prior {
            Some(prior) => self.release_deductions(run_id, period, prior).await,
            None => Ok(Vec::new()),
        };
        let stored = match released {
            Ok(updates) => self.store_record(&record, &updates).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            error!(
                run_id,
                employee_id = %employee.id,
                error = %e,
                "Failed to store error record"
            );
        }
        record
    }

    async fn store_record(
        &self,
        record: &PayrollRecord,
        updates: &[LoanDeductionUpdate],
    ) -> EngineResult<()> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "upsert_payroll_record", move || {
            self.payroll
                .upsert_payroll_record(record.clone(), updates.to_vec())
        })
        .await
    }

    async fn compute_employee(
        &self,
        run_id: &str,
        period: PayrollPeriod,
        employee: &PayrollEmployee,
        prior: Option<&PayrollRecord>,
    ) -> EngineResult<(PayrollRecord, Vec<LoanDeductionUpdate>)> {
        let config = &self.config;
        let retry = config.payroll().retry;
        let employee_id = employee.id.as_str();

        let attendance = with_retry(&retry, "get_attendance_summary", move || {
            self.payroll.get_attendance_summary(employee_id, period)
        })
        .await?
        .ok_or_else(|| EngineError::Calculation {
            employee_id: employee_id.to_string(),
            message: format!("no attendance summary for {}", period),
        })?;

        let as_of = period.last_day();
        let structure = with_retry(&retry, "get_salary_structure", move || {
            self.payroll.get_salary_structure(employee_id, as_of)
        })
        .await?
        .ok_or_else(|| EngineError::MissingSalaryStructure {
            employee_id: employee_id.to_string(),
            as_of,
        })?;
        structure.validate().map_err(|e| EngineError::Calculation {
            employee_id: employee_id.to_string(),
            message: format!("invalid salary structure v{}: {}", structure.version, e),
        })?;

        let proration = prorate_salary(&structure.components, &attendance)?;
        let earned = proration.earned;
        let gross = earned.gross();
        let mut audit_trail = vec![proration.audit_step];

        let provident_fund = if employee.pf_enrolled {
            let pf = calculate_provident_fund(earned.basic, config.provident_fund());
            audit_trail.push(pf.audit_step);
            pf.contribution
        } else {
            audit_trail.push(AuditStep::new(
                "provident_fund",
                "Provident Fund",
                config.provident_fund().statute_ref.as_str(),
                "Not enrolled in Provident Fund; no contribution",
            ));
            ProvidentFundContribution::default()
        };

        let esi = calculate_esi(gross, config.esi());
        audit_trail.push(esi.audit_step);

        let professional_tax = calculate_professional_tax(
            gross,
            &employee.work_state,
            employee.gender,
            period,
            config.professional_tax(),
        );
        audit_trail.push(professional_tax.audit_step);

        let fy_start_year = period.fy_start_year();
        let table = config
            .tax_regime_for(structure.tax_regime, fy_start_year)
            .ok_or_else(|| EngineError::Calculation {
                employee_id: employee_id.to_string(),
                message: format!(
                    "no {} regime tax table for FY {}",
                    structure.tax_regime.as_str(),
                    period.fy_label()
                ),
            })?;
        let withheld = with_retry(&retry, "get_tds_withheld", move || {
            self.payroll.get_tds_withheld(employee_id, fy_start_year, period)
        })
        .await?;
        let tds = calculate_tds(
            gross,
            withheld,
            period,
            table,
            config.income_tax().cess_rate,
            &config.income_tax().statute_ref,
        );
        audit_trail.push(tds.audit_step);

        let statutory = provident_fund.employee
            + esi.contribution.employee
            + professional_tax.amount
            + tds.monthly_tds;

        let installments = self.due_installments(run_id, period, employee_id, prior).await?;
        let recovery = plan_recovery(
            &config.payroll().loan_policy,
            gross,
            gross - statutory,
            installments,
            run_id,
        )?;
        audit_trail.extend(recovery.audit_steps);

        let total_deductions = statutory + recovery.recovered;
        let record = PayrollRecord {
            id: prior
                .map(|p| p.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            run_id: run_id.to_string(),
            employee_id: employee_id.to_string(),
            period,
            working_days: attendance.working_days,
            paid_days: attendance.paid_days,
            lop_days: attendance.lop_days,
            earnings: earned,
            gross_earnings: gross,
            provident_fund,
            esi: esi.contribution,
            professional_tax: professional_tax.amount,
            tds: tds.monthly_tds,
            loan_deductions: recovery.applied,
            loan_recovery: recovery.recovered,
            total_deductions,
            net_pay: gross - total_deductions,
            status: RecordStatus::Calculated,
            error_message: None,
            audit_trail,
            calculated_at: Utc::now(),
        };

        debug!(
            run_id,
            employee_id,
            gross = %record.gross_earnings,
            net_pay = %record.net_pay,
            "Employee payroll calculated"
        );
        Ok((record, recovery.updates))
    }

    /// Collects this period's installment for each active loan, plus any
    /// installment this run already recovered from a loan that it closed.
    async fn due_installments(
        &self,
        run_id: &str,
        period: PayrollPeriod,
        employee_id: &str,
        prior: Option<&PayrollRecord>,
    ) -> EngineResult<Vec<(EmployeeLoan, LoanDeduction)>> {
        let retry = self.config.payroll().retry;
        let loans = with_retry(&retry, "get_active_loans", move || {
            self.loans.get_active_loans(employee_id)
        })
        .await?;

        let mut installments = Vec::with_capacity(loans.len());
        for loan in loans {
            if let Some(deduction) = self.loan_deduction(&loan.id, period).await? {
                installments.push((loan, deduction));
            }
        }

        let closed_here = prior
            .into_iter()
            .flat_map(|p| p.loan_deductions.iter())
            .filter(|a| a.status == LoanDeductionStatus::Deducted)
            .filter(|a| installments.iter().all(|(loan, _)| loan.id != a.loan_id))
            .map(|a| a.loan_id.clone())
            .collect::<Vec<_>>();
        for loan_id in closed_here {
            let Some(deduction) = self.loan_deduction(&loan_id, period).await? else {
                continue;
            };
            if deduction.status == LoanDeductionStatus::Deducted
                && deduction.run_id.as_deref() == Some(run_id)
            {
                installments.push((self.loan(&loan_id).await?, deduction));
            }
        }

        Ok(installments)
    }

    /// Builds the updates that hand back every installment this run handled
    /// for the prior record.
    pub(super) async fn release_deductions(
        &self,
        run_id: &str,
        period: PayrollPeriod,
        prior: &PayrollRecord,
    ) -> EngineResult<Vec<LoanDeductionUpdate>> {
        let mut updates = Vec::new();
        for applied in &prior.loan_deductions {
            let Some(deduction) = self.loan_deduction(&applied.loan_id, period).await? else {
                continue;
            };
            if deduction.status == LoanDeductionStatus::Scheduled
                || deduction.run_id.as_deref() != Some(run_id)
            {
                continue;
            }
            let loan = self.loan(&applied.loan_id).await?;
            updates.push(revert_deduction(&loan, &deduction)?);
        }
        Ok(updates)
    }

    async fn loan(&self, loan_id: &str) -> EngineResult<EmployeeLoan> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "get_loan", move || self.loans.get_loan(loan_id))
            .await?
            .ok_or_else(|| {
                StoreError::NotFound {
                    entity: "loan",
                    id: loan_id.to_string(),
                }
                .into()
            })
    }

    async fn loan_deduction(
        &self,
        loan_id: &str,
        period: PayrollPeriod,
    ) -> EngineResult<Option<LoanDeduction>> {
        let retry = self.config.payroll().retry;
        with_retry(&retry, "get_loan_deduction", move || {
            self.loans.get_loan_deduction(loan_id, period)
        })
        .await
    }
}
