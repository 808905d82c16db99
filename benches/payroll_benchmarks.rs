//! Performance benchmarks for the Payroll Engine.
//!
//! Targets:
//! - Statutory calculators for one employee: < 50μs mean
//! - Loan schedule for a 60-month loan: < 100μs mean
//! - Payroll run of 1000 employees on the in-memory store: < 1s mean
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;

use payroll_engine::calculation::{
    calculate_esi, calculate_professional_tax, calculate_provident_fund, calculate_tds,
    prorate_salary,
};
use payroll_engine::config::{ConfigLoader, StatutoryConfig};
use payroll_engine::loans::generate_schedule;
use payroll_engine::models::{
    AttendanceLock, AttendanceSummary, Gender, PayrollEmployee, PayrollPeriod, SalaryComponents,
    SalaryStructure, TaxRegime,
};
use payroll_engine::money::Paise;
use payroll_engine::orchestrator::PayrollOrchestrator;
use payroll_engine::store::{MemoryStore, RecordingNotifier};

fn load_config() -> StatutoryConfig {
    ConfigLoader::load("./config/india")
        .expect("Failed to load config")
        .into_config()
}

fn period() -> PayrollPeriod {
    PayrollPeriod::new(4, 2025).unwrap()
}

fn components(monthly_rupees: i64) -> SalaryComponents {
    SalaryComponents {
        basic: Paise::from_rupees(monthly_rupees * 4 / 10),
        hra: Paise::from_rupees(monthly_rupees * 2 / 10),
        special_allowance: Paise::from_rupees(monthly_rupees * 4 / 10),
        ..Default::default()
    }
}

/// Seeds a locked month with `count` employees on salaries from ₹15,000 to
/// ₹2,14,000, some with loss-of-pay days.
fn seeded_store(count: u32) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for n in 0..count {
        let id = format!("emp_{:04}", n);
        store
            .insert_employee(PayrollEmployee {
                id: id.clone(),
                code: format!("E{:04}", n),
                name: format!("Employee {}", n),
                gender: if n % 2 == 0 { Gender::Male } else { Gender::Female },
                work_state: if n % 3 == 0 { "KA" } else { "MH" }.to_string(),
                uan: Some(format!("1001{:08}", n)),
                esi_number: Some(format!("31{:08}", n)),
                pan: None,
                pf_enrolled: n % 10 != 0,
            })
            .unwrap();
        store
            .insert_salary_structure(SalaryStructure {
                employee_id: id.clone(),
                version: 1,
                effective_from: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                effective_to: None,
                components: components(15_000 + i64::from(n % 200) * 1_000),
                tax_regime: if n % 4 == 0 { TaxRegime::Old } else { TaxRegime::New },
            })
            .unwrap();
        let lop = Decimal::from(n % 3);
        store
            .set_attendance(
                &id,
                period(),
                AttendanceSummary {
                    working_days: Decimal::from(30),
                    paid_days: Decimal::from(30) - lop,
                    lop_days: lop,
                },
            )
            .unwrap();
    }
    store
        .set_attendance_lock(AttendanceLock::lock(period(), "hr_admin", Utc::now()))
        .unwrap();
    store
}

/// Benchmark: every calculator for one employee.
///
/// Target: < 50μs mean
fn bench_employee_calculators(c: &mut Criterion) {
    let config = load_config();
    let table = config
        .tax_regime_for(TaxRegime::New, period().fy_start_year())
        .expect("missing tax table");
    let attendance = AttendanceSummary {
        working_days: Decimal::from(30),
        paid_days: Decimal::from(28),
        lop_days: Decimal::from(2),
    };
    let salary = components(85_000);

    c.bench_function("employee_calculators", |b| {
        b.iter(|| {
            let proration = prorate_salary(black_box(&salary), &attendance).unwrap();
            let gross = proration.earned.gross();
            let pf = calculate_provident_fund(proration.earned.basic, config.provident_fund());
            let esi = calculate_esi(gross, config.esi());
            let pt = calculate_professional_tax(
                gross,
                "MH",
                Gender::Male,
                period(),
                config.professional_tax(),
            );
            let tds = calculate_tds(
                gross,
                Paise::ZERO,
                period(),
                table,
                config.income_tax().cess_rate,
                &config.income_tax().statute_ref,
            );
            black_box((pf, esi, pt, tds))
        })
    });
}

/// Benchmark: amortization schedules by tenure.
///
/// Target: < 100μs mean for 60 months
fn bench_loan_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("loan_schedule");

    for tenure in [12u32, 36, 60] {
        group.bench_with_input(BenchmarkId::from_parameter(tenure), &tenure, |b, &tenure| {
            b.iter(|| {
                generate_schedule(
                    black_box(Paise::from_rupees(500_000)),
                    Decimal::new(105, 1),
                    tenure,
                    period(),
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

/// Benchmark: full payroll runs.
///
/// Target: < 1s mean for 1000 employees
fn bench_payroll_run(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = Arc::new(load_config());

    let mut group = c.benchmark_group("payroll_run");
    group.sample_size(10);

    for count in [100u32, 1000] {
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&rt).iter_batched(
                || {
                    let store = seeded_store(count);
                    PayrollOrchestrator::new(
                        store.clone(),
                        store,
                        Arc::new(RecordingNotifier::new()),
                        config.clone(),
                    )
                },
                |orchestrator| async move {
                    let summary = orchestrator.start_run(4, 2025).await.unwrap();
                    black_box(summary)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_employee_calculators,
    bench_loan_schedule,
    bench_payroll_run,
);
criterion_main!(benches);
