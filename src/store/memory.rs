//! In-memory implementation of the storage ports.
//!
//! Everything lives behind one mutex, so each port call is atomic. Tests can
//! make named operations fail transiently a given number of times to
//! exercise retry handling.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::loans::apply_update;
use crate::models::{
    AttendanceLock, AttendanceSummary, DeadlineType, EmployeeLoan, LoanDeduction,
    LoanDeductionUpdate, LoanStatus, PayrollEmployee, PayrollPeriod, PayrollRecord, PayrollRun,
    PayrollRunPatch, RecordStatus, SalaryStructure, StatutoryDeadline,
};
use crate::money::Paise;
use crate::ports::{DeadlineStore, LoanStore, PayrollStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    employees: BTreeMap<String, PayrollEmployee>,
    salary_structures: HashMap<String, Vec<SalaryStructure>>,
    attendance: HashMap<(String, PayrollPeriod), AttendanceSummary>,
    locks: HashMap<PayrollPeriod, AttendanceLock>,
    runs: HashMap<String, PayrollRun>,
    records: BTreeMap<(String, String), PayrollRecord>,
    loans: HashMap<String, EmployeeLoan>,
    deductions: BTreeMap<(String, PayrollPeriod), LoanDeduction>,
    deadlines: BTreeMap<(DeadlineType, PayrollPeriod), StatutoryDeadline>,
}

#[derive(Default)]
struct Faults {
    pending: HashMap<String, u32>,
    calls: HashMap<String, u32>,
}

/// A thread-safe in-memory store implementing every storage port.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn enter(&self, operation: &str) -> StoreResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        *faults.calls.entry(operation.to_string()).or_default() += 1;
        if let Some(remaining) = faults.pending.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Transient {
                    operation: operation.to_string(),
                    message: "injected failure".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Makes the next `times` calls of `operation` fail transiently.
    pub fn fail_next(&self, operation: &str, times: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.pending.insert(operation.to_string(), times);
        }
    }

    /// Returns how many times `operation` has been called.
    pub fn call_count(&self, operation: &str) -> u32 {
        self.faults
            .lock()
            .map(|faults| faults.calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Adds or replaces an employee.
    pub fn insert_employee(&self, employee: PayrollEmployee) -> StoreResult<()> {
        self.tables()?.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    /// Adds a salary structure after checking it against the employee's
    /// existing history.
    pub fn insert_salary_structure(&self, structure: SalaryStructure) -> EngineResult<()> {
        structure.validate()?;
        let mut tables = self.tables()?;
        let history = tables
            .salary_structures
            .entry(structure.employee_id.clone())
            .or_default();
        let mut candidate = history.clone();
        candidate.push(structure);
        SalaryStructure::validate_history(&candidate)?;
        *history = candidate;
        Ok(())
    }

    /// Records an employee's attendance for a period.
    pub fn set_attendance(
        &self,
        employee_id: &str,
        period: PayrollPeriod,
        summary: AttendanceSummary,
    ) -> StoreResult<()> {
        self.tables()?
            .attendance
            .insert((employee_id.to_string(), period), summary);
        Ok(())
    }

    /// Stores an attendance lock.
    pub fn set_attendance_lock(&self, lock: AttendanceLock) -> StoreResult<()> {
        self.tables()?.locks.insert(lock.period, lock);
        Ok(())
    }

    /// Replaces a payroll record without any status checks.
    pub fn put_record(&self, record: PayrollRecord) -> StoreResult<()> {
        self.tables()?.records.insert(
            (record.run_id.clone(), record.employee_id.clone()),
            record,
        );
        Ok(())
    }
}

fn check_updates(tables: &Tables, updates: &[LoanDeductionUpdate]) -> StoreResult<()> {
    for update in updates {
        if !tables.loans.contains_key(&update.loan_id) {
            return Err(StoreError::NotFound {
                entity: "loan",
                id: update.loan_id.clone(),
            });
        }
        if !tables
            .deductions
            .contains_key(&(update.loan_id.clone(), update.period))
        {
            return Err(StoreError::NotFound {
                entity: "loan_deduction",
                id: format!("{}/{:02}-{}", update.loan_id, update.period.month, update.period.year),
            });
        }
    }
    Ok(())
}

fn commit_updates(tables: &mut Tables, updates: &[LoanDeductionUpdate]) {
    for update in updates {
        let key = (update.loan_id.clone(), update.period);
        if let (Some(loan), Some(deduction)) =
            (tables.loans.get_mut(&update.loan_id), tables.deductions.get_mut(&key))
        {
            apply_update(update, loan, deduction);
        }
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn list_payroll_employees(&self, _period: PayrollPeriod) -> StoreResult<Vec<PayrollEmployee>> {
        self.enter("list_payroll_employees")?;
        Ok(self.tables()?.employees.values().cloned().collect())
    }

    async fn get_payroll_employee(&self, employee_id: &str) -> StoreResult<Option<PayrollEmployee>> {
        self.enter("get_payroll_employee")?;
        Ok(self.tables()?.employees.get(employee_id).cloned())
    }

    async fn get_salary_structure(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> StoreResult<Option<SalaryStructure>> {
        self.enter("get_salary_structure")?;
        let tables = self.tables()?;
        Ok(tables
            .salary_structures
            .get(employee_id)
            .and_then(|history| SalaryStructure::effective_on(history, as_of))
            .cloned())
    }

    async fn get_attendance_summary(
        &self,
        employee_id: &str,
        period: PayrollPeriod,
    ) -> StoreResult<Option<AttendanceSummary>> {
        self.enter("get_attendance_summary")?;
        Ok(self
            .tables()?
            .attendance
            .get(&(employee_id.to_string(), period))
            .copied())
    }

    async fn get_attendance_lock(&self, period: PayrollPeriod) -> StoreResult<Option<AttendanceLock>> {
        self.enter("get_attendance_lock")?;
        Ok(self.tables()?.locks.get(&period).cloned())
    }

    async fn get_tds_withheld(
        &self,
        employee_id: &str,
        fy_start_year: i32,
        before: PayrollPeriod,
    ) -> StoreResult<Paise> {
        self.enter("get_tds_withheld")?;
        let tables = self.tables()?;
        Ok(tables
            .records
            .values()
            .filter(|r| r.employee_id == employee_id && r.status != RecordStatus::Error)
            .filter(|r| r.period.fy_start_year() == fy_start_year && r.period < before)
            .filter(|r| tables.runs.get(&r.run_id).is_some_and(|run| !run.reverted))
            .map(|r| r.tds)
            .sum())
    }

    async fn create_payroll_run(&self, run: PayrollRun) -> StoreResult<()> {
        self.enter("create_payroll_run")?;
        let mut tables = self.tables()?;
        if let Some(existing) = tables
            .runs
            .values()
            .find(|r| r.period == run.period && r.blocks_period())
        {
            return Err(StoreError::Conflict {
                entity: "payroll_run",
                message: format!(
                    "run {} already covers {:02}/{}",
                    existing.id, run.period.month, run.period.year
                ),
            });
        }
        tables.runs.insert(run.id.clone(), run);
        Ok(())
    }

    async fn get_payroll_run(&self, run_id: &str) -> StoreResult<Option<PayrollRun>> {
        self.enter("get_payroll_run")?;
        Ok(self.tables()?.runs.get(run_id).cloned())
    }

    async fn find_active_run(&self, period: PayrollPeriod) -> StoreResult<Option<PayrollRun>> {
        self.enter("find_active_run")?;
        Ok(self
            .tables()?
            .runs
            .values()
            .filter(|r| r.period == period && r.blocks_period())
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn update_payroll_run(&self, run_id: &str, patch: PayrollRunPatch) -> StoreResult<PayrollRun> {
        self.enter("update_payroll_run")?;
        let mut tables = self.tables()?;
        let run = tables.runs.get_mut(run_id).ok_or_else(|| StoreError::NotFound {
            entity: "payroll_run",
            id: run_id.to_string(),
        })?;
        patch.validate(run).map_err(|e| StoreError::Conflict {
            entity: "payroll_run",
            message: e.to_string(),
        })?;
        patch.apply(run);
        Ok(run.clone())
    }

    async fn upsert_payroll_record(
        &self,
        record: PayrollRecord,
        loan_updates: Vec<LoanDeductionUpdate>,
    ) -> StoreResult<()> {
        self.enter("upsert_payroll_record")?;
        let mut tables = self.tables()?;

        if !tables.runs.contains_key(&record.run_id) {
            return Err(StoreError::NotFound {
                entity: "payroll_run",
                id: record.run_id.clone(),
            });
        }
        let key = (record.run_id.clone(), record.employee_id.clone());
        if let Some(existing) = tables.records.get(&key) {
            if !existing.status.is_recomputable() {
                return Err(StoreError::Conflict {
                    entity: "payroll_record",
                    message: format!(
                        "record for {} is {}",
                        existing.employee_id,
                        existing.status.as_str()
                    ),
                });
            }
        }
        check_updates(&tables, &loan_updates)?;

        commit_updates(&mut tables, &loan_updates);
        tables.records.insert(key, record);
        Ok(())
    }

    async fn set_record_status(
        &self,
        run_id: &str,
        employee_id: &str,
        from: RecordStatus,
        to: RecordStatus,
    ) -> StoreResult<PayrollRecord> {
        self.enter("set_record_status")?;
        let mut tables = self.tables()?;
        let record = tables
            .records
            .get_mut(&(run_id.to_string(), employee_id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                entity: "payroll_record",
                id: format!("{}/{}", run_id, employee_id),
            })?;
        if record.status != from {
            return Err(StoreError::Conflict {
                entity: "payroll_record",
                message: format!(
                    "record for {} is {}, expected {}",
                    employee_id,
                    record.status.as_str(),
                    from.as_str()
                ),
            });
        }
        record.status = to;
        Ok(record.clone())
    }

    async fn get_payroll_record(
        &self,
        run_id: &str,
        employee_id: &str,
    ) -> StoreResult<Option<PayrollRecord>> {
        self.enter("get_payroll_record")?;
        Ok(self
            .tables()?
            .records
            .get(&(run_id.to_string(), employee_id.to_string()))
            .cloned())
    }

    async fn list_payroll_records(&self, run_id: &str) -> StoreResult<Vec<PayrollRecord>> {
        self.enter("list_payroll_records")?;
        Ok(self
            .tables()?
            .records
            .values()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn delete_payroll_records(&self, run_id: &str) -> StoreResult<usize> {
        self.enter("delete_payroll_records")?;
        let mut tables = self.tables()?;
        let before = tables.records.len();
        tables.records.retain(|(run, _), _| run != run_id);
        Ok(before - tables.records.len())
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn save_loan(&self, loan: EmployeeLoan, deductions: Vec<LoanDeduction>) -> StoreResult<()> {
        self.enter("save_loan")?;
        let mut tables = self.tables()?;
        if !deductions.is_empty() {
            tables.deductions.retain(|(loan_id, _), _| loan_id != &loan.id);
            for deduction in deductions {
                tables
                    .deductions
                    .insert((deduction.loan_id.clone(), deduction.period), deduction);
            }
        }
        tables.loans.insert(loan.id.clone(), loan);
        Ok(())
    }

    async fn get_loan(&self, loan_id: &str) -> StoreResult<Option<EmployeeLoan>> {
        self.enter("get_loan")?;
        Ok(self.tables()?.loans.get(loan_id).cloned())
    }

    async fn get_active_loans(&self, employee_id: &str) -> StoreResult<Vec<EmployeeLoan>> {
        self.enter("get_active_loans")?;
        let mut loans: Vec<EmployeeLoan> = self
            .tables()?
            .loans
            .values()
            .filter(|l| l.employee_id == employee_id && l.status == LoanStatus::Active)
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(loans)
    }

    async fn get_loan_deduction(
        &self,
        loan_id: &str,
        period: PayrollPeriod,
    ) -> StoreResult<Option<LoanDeduction>> {
        self.enter("get_loan_deduction")?;
        Ok(self
            .tables()?
            .deductions
            .get(&(loan_id.to_string(), period))
            .cloned())
    }

    async fn list_loan_deductions(&self, loan_id: &str) -> StoreResult<Vec<LoanDeduction>> {
        self.enter("list_loan_deductions")?;
        let mut rows: Vec<LoanDeduction> = self
            .tables()?
            .deductions
            .values()
            .filter(|d| d.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.installment_no);
        Ok(rows)
    }

    async fn apply_loan_updates(&self, updates: Vec<LoanDeductionUpdate>) -> StoreResult<()> {
        self.enter("apply_loan_updates")?;
        let mut tables = self.tables()?;
        check_updates(&tables, &updates)?;
        commit_updates(&mut tables, &updates);
        Ok(())
    }
}

#[async_trait]
impl DeadlineStore for MemoryStore {
    async fn upsert_deadline(&self, deadline: StatutoryDeadline) -> StoreResult<StatutoryDeadline> {
        self.enter("upsert_deadline")?;
        let mut tables = self.tables()?;
        let stored = tables
            .deadlines
            .entry(deadline.key())
            .and_modify(|existing| existing.due_date = deadline.due_date)
            .or_insert(deadline);
        Ok(stored.clone())
    }

    async fn get_deadline(
        &self,
        deadline_type: DeadlineType,
        period: PayrollPeriod,
    ) -> StoreResult<Option<StatutoryDeadline>> {
        self.enter("get_deadline")?;
        Ok(self.tables()?.deadlines.get(&(deadline_type, period)).cloned())
    }

    async fn list_open_deadlines(&self) -> StoreResult<Vec<StatutoryDeadline>> {
        self.enter("list_open_deadlines")?;
        let mut open: Vec<StatutoryDeadline> = self
            .tables()?
            .deadlines
            .values()
            .filter(|d| d.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|d| (d.due_date, d.deadline_type));
        Ok(open)
    }

    async fn update_deadline(&self, deadline: StatutoryDeadline) -> StoreResult<()> {
        self.enter("update_deadline")?;
        let mut tables = self.tables()?;
        match tables.deadlines.get_mut(&deadline.key()) {
            Some(existing) => {
                *existing = deadline;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "statutory_deadline",
                id: format!(
                    "{}/{:02}-{}",
                    deadline.deadline_type.as_str(),
                    deadline.period.month,
                    deadline.period.year
                ),
            }),
        }
    }
}
