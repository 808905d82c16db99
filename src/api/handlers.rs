//! HTTP request handlers for the Payroll Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::export::FilingKind;

use super::request::{CancelRunRequest, StartRunRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

const EMPLOYEE_COUNT: &str = "x-employee-count";
const ERROR_RECORDS: &str = "x-error-records";
const MISSING_IDENTIFIERS: &str = "x-missing-identifiers";

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/payroll-runs", post(start_run_handler))
        .route("/payroll-runs/:run_id", get(get_run_handler))
        .route("/payroll-runs/:run_id/records", get(list_records_handler))
        .route("/payroll-runs/:run_id/revert", post(revert_run_handler))
        .route("/payroll-runs/:run_id/cancel", post(cancel_run_handler))
        .route(
            "/payroll-runs/:run_id/records/:employee_id/recalculate",
            post(recalculate_handler),
        )
        .route(
            "/payroll-runs/:run_id/records/:employee_id/verify",
            post(verify_record_handler),
        )
        .route(
            "/payroll-runs/:run_id/records/:employee_id/pay",
            post(pay_record_handler),
        )
        .route("/payroll-runs/:run_id/exports/ecr", get(ecr_export_handler))
        .route("/payroll-runs/:run_id/exports/esi", get(esi_export_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(correlation_id: Uuid, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        error = %err,
        kind = ?err.kind(),
        "Request failed"
    );
    let api_error: ApiErrorResponse = err.into();
    json_response(api_error.status, api_error.error)
}

fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for POST /payroll-runs.
///
/// Runs payroll for the requested month and returns the finished run's
/// summary. Per-employee failures do not fail the request; they show up in
/// the summary's error counter.
async fn start_run_handler(
    State(state): State<AppState>,
    payload: Result<Json<StartRunRequest>, JsonRejection>,
) -> Response {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        month = request.month,
        year = request.year,
        "Processing payroll run request"
    );

    let start_time = Instant::now();
    match state
        .orchestrator()
        .start_run(request.month, request.year)
        .await
    {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                run_id = %summary.run_id,
                status = summary.status.as_str(),
                employees = summary.counters.total,
                errors = summary.counters.error,
                duration_ms = start_time.elapsed().as_millis(),
                "Payroll run finished"
            );
            json_response(StatusCode::CREATED, summary)
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for GET /payroll-runs/:run_id.
async fn get_run_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    match state.orchestrator().run_summary(&run_id).await {
        Ok(summary) => json_response(StatusCode::OK, summary),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for GET /payroll-runs/:run_id/records.
async fn list_records_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    match state.orchestrator().list_records(&run_id).await {
        Ok(records) => json_response(StatusCode::OK, records),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /payroll-runs/:run_id/revert.
async fn revert_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Reverting payroll run");
    match state.orchestrator().revert_run(&run_id).await {
        Ok(summary) => json_response(StatusCode::OK, summary),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /payroll-runs/:run_id/cancel.
async fn cancel_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<CancelRunRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        run_id = %run_id,
        reason = %request.reason,
        "Cancelling payroll run"
    );
    match state.orchestrator().cancel_run(&run_id, &request.reason).await {
        Ok(summary) => json_response(StatusCode::OK, summary),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /payroll-runs/:run_id/records/:employee_id/recalculate.
async fn recalculate_handler(
    State(state): State<AppState>,
    Path((run_id, employee_id)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    match state
        .orchestrator()
        .recalculate_employee(&run_id, &employee_id)
        .await
    {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /payroll-runs/:run_id/records/:employee_id/verify.
async fn verify_record_handler(
    State(state): State<AppState>,
    Path((run_id, employee_id)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    match state.orchestrator().verify_record(&run_id, &employee_id).await {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /payroll-runs/:run_id/records/:employee_id/pay.
async fn pay_record_handler(
    State(state): State<AppState>,
    Path((run_id, employee_id)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    match state
        .orchestrator()
        .mark_record_paid(&run_id, &employee_id)
        .await
    {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for GET /payroll-runs/:run_id/exports/ecr.
async fn ecr_export_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    export(state, run_id, FilingKind::Ecr).await
}

/// Handler for GET /payroll-runs/:run_id/exports/esi.
async fn esi_export_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    export(state, run_id, FilingKind::EsiContribution).await
}

/// Returns the filing as plain text. What was left out of the file is
/// reported in headers.
async fn export(state: AppState, run_id: String, kind: FilingKind) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, kind = ?kind, "Exporting filing");

    match state.orchestrator().filing(&run_id, kind).await {
        Ok(export) => (
            StatusCode::OK,
            [
                ("content-type", "text/plain; charset=utf-8".to_string()),
                (EMPLOYEE_COUNT, export.employee_count.to_string()),
                (ERROR_RECORDS, export.error_records.to_string()),
                (MISSING_IDENTIFIERS, export.missing_identifier.join(",")),
            ],
            export.content,
        )
            .into_response(),
        Err(err) => error_response(correlation_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::{
        AttendanceLock, AttendanceSummary, Gender, PayrollEmployee, PayrollPeriod,
        SalaryComponents, SalaryStructure, TaxRegime,
    };
    use crate::money::Paise;
    use crate::store::{MemoryStore, RecordingNotifier};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state(lock: bool) -> AppState {
        let store = Arc::new(MemoryStore::new());
        let period = PayrollPeriod::new(4, 2025).unwrap();
        store
            .insert_employee(PayrollEmployee {
                id: "emp_001".to_string(),
                code: "E001".to_string(),
                name: "Asha Rao".to_string(),
                gender: Gender::Female,
                work_state: "KA".to_string(),
                uan: Some("100100100100".to_string()),
                esi_number: None,
                pan: None,
                pf_enrolled: true,
            })
            .unwrap();
        store
            .insert_salary_structure(SalaryStructure {
                employee_id: "emp_001".to_string(),
                version: 1,
                effective_from: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                effective_to: None,
                components: SalaryComponents {
                    basic: Paise::from_rupees(30_000),
                    hra: Paise::from_rupees(12_000),
                    special_allowance: Paise::from_rupees(8_000),
                    ..Default::default()
                },
                tax_regime: TaxRegime::New,
            })
            .unwrap();
        store
            .set_attendance("emp_001", period, AttendanceSummary::full_month(Decimal::from(30)))
            .unwrap();
        if lock {
            store
                .set_attendance_lock(AttendanceLock::lock(period, "hr_admin", Utc::now()))
                .unwrap();
        }

        let config = ConfigLoader::load("./config/india")
            .expect("Failed to load config")
            .into_config();
        AppState::in_memory(store, Arc::new(RecordingNotifier::new()), config)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// API-001: a run for a locked month returns 201 with its summary
    #[tokio::test]
    async fn test_api_001_start_run_returns_201() {
        let router = create_router(create_test_state(true));

        let response = router
            .oneshot(post_json("/payroll-runs", r#"{"month": 4, "year": 2025}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "completed");
        assert_eq!(json["counters"]["success"], 1);
        assert_eq!(json["totals"]["gross"], 5_000_000);
    }

    /// API-002: an unlocked month is refused with 409
    #[tokio::test]
    async fn test_api_002_unlocked_month_returns_409() {
        let router = create_router(create_test_state(false));

        let response = router
            .oneshot(post_json("/payroll-runs", r#"{"month": 4, "year": 2025}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "ATTENDANCE_NOT_LOCKED");
    }

    /// API-003: month 13 is a validation error
    #[tokio::test]
    async fn test_api_003_invalid_month_returns_400() {
        let router = create_router(create_test_state(true));

        let response = router
            .oneshot(post_json("/payroll-runs", r#"{"month": 13, "year": 2025}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let router = create_router(create_test_state(true));

        let response = router
            .oneshot(post_json("/payroll-runs", r#"{"month": 4}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["message"].as_str().unwrap().contains("year"));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state(true));

        let response = router
            .oneshot(post_json("/payroll-runs", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_content_type_returns_400() {
        let router = create_router(create_test_state(true));

        let request = Request::builder()
            .method("POST")
            .uri("/payroll-runs")
            .body(Body::from(r#"{"month": 4, "year": 2025}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "MISSING_CONTENT_TYPE");
    }

    #[tokio::test]
    async fn test_unknown_run_returns_404() {
        let router = create_router(create_test_state(true));

        let response = router.oneshot(get("/payroll-runs/nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
    }

    /// API-004: the ECR download is plain text with one line per member
    #[tokio::test]
    async fn test_api_004_ecr_export_is_plain_text() {
        let state = create_test_state(true);
        let summary = state.orchestrator().start_run(4, 2025).await.unwrap();
        let router = create_router(state);

        let response = router
            .oneshot(get(&format!("/payroll-runs/{}/exports/ecr", summary.run_id)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers().get("x-employee-count").unwrap(), "1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("MHBAN0012345000#~#"));
        assert!(lines[1].starts_with("100100100100#~#Asha Rao#~#50000.00#~#15000.00"));
    }

    #[tokio::test]
    async fn test_esi_export_without_covered_employees_has_header_only() {
        let state = create_test_state(true);
        let summary = state.orchestrator().start_run(4, 2025).await.unwrap();
        let router = create_router(state);

        let response = router
            .oneshot(get(&format!("/payroll-runs/{}/exports/esi", summary.run_id)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-employee-count").unwrap(), "0");
    }

    #[tokio::test]
    async fn test_export_of_reverted_run_returns_409() {
        let state = create_test_state(true);
        let summary = state.orchestrator().start_run(4, 2025).await.unwrap();
        state.orchestrator().revert_run(&summary.run_id).await.unwrap();
        let router = create_router(state);

        let response = router
            .oneshot(get(&format!("/payroll-runs/{}/exports/ecr", summary.run_id)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "RUN_NOT_COMPLETED");
    }

    #[tokio::test]
    async fn test_paying_unverified_record_returns_409() {
        let state = create_test_state(true);
        let summary = state.orchestrator().start_run(4, 2025).await.unwrap();
        let router = create_router(state);

        let response = router
            .oneshot(post_json(
                &format!("/payroll-runs/{}/records/emp_001/pay", summary.run_id),
                "",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_TRANSITION");
    }
}
