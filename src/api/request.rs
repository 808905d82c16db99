//! Request types for the Payroll Engine API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /payroll-runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunRequest {
    /// Payroll month, 1 to 12.
    pub month: u32,
    /// Payroll year.
    pub year: i32,
}

/// Request body for `POST /payroll-runs/:id/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunRequest {
    /// Why the run is being cancelled.
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "cancelled by operator".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_start_run_request() {
        let request: StartRunRequest =
            serde_json::from_str(r#"{"month": 4, "year": 2025}"#).unwrap();
        assert_eq!(request.month, 4);
        assert_eq!(request.year, 2025);
    }

    #[test]
    fn test_start_run_request_requires_year() {
        let result = serde_json::from_str::<StartRunRequest>(r#"{"month": 4}"#);
        assert!(result.unwrap_err().to_string().contains("year"));
    }

    #[test]
    fn test_cancel_reason_defaults() {
        let request: CancelRunRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.reason, "cancelled by operator");
    }
}
