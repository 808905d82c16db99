//! Employee view used by payroll.
//!
//! Employee master data lives outside the engine; this is the read-only
//! projection the orchestrator and exporters need.

use serde::{Deserialize, Serialize};

/// Gender as recorded for professional-tax slab selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other or undisclosed.
    Other,
}

/// An employee included in a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollEmployee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Human-facing employee code.
    pub code: String,
    /// Full name as it should appear on filings.
    pub name: String,
    /// Gender, used by gender-specific professional-tax slabs.
    pub gender: Gender,
    /// State code of the place of work (e.g., "MH", "KA").
    pub work_state: String,
    /// PF universal account number.
    #[serde(default)]
    pub uan: Option<String>,
    /// ESI insured-person number.
    #[serde(default)]
    pub esi_number: Option<String>,
    /// Income-tax PAN.
    #[serde(default)]
    pub pan: Option<String>,
    /// Whether the employee is enrolled in the Provident Fund.
    #[serde(default = "default_true")]
    pub pf_enrolled: bool,
}

fn default_true() -> bool {
    true
}

impl PayrollEmployee {
    /// Returns the UAN if present and non-blank.
    pub fn uan(&self) -> Option<&str> {
        non_blank(self.uan.as_deref())
    }

    /// Returns the ESI insured-person number if present and non-blank.
    pub fn esi_number(&self) -> Option<&str> {
        non_blank(self.esi_number.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_employee_with_defaults() {
        let json = r#"{
            "id": "emp_001",
            "code": "E001",
            "name": "Asha Rao",
            "gender": "female",
            "work_state": "MH"
        }"#;

        let employee: PayrollEmployee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.gender, Gender::Female);
        assert!(employee.pf_enrolled);
        assert!(employee.uan.is_none());
    }

    #[test]
    fn test_blank_identifiers_are_treated_as_missing() {
        let employee = PayrollEmployee {
            id: "emp_002".to_string(),
            code: "E002".to_string(),
            name: "Vikram Shah".to_string(),
            gender: Gender::Male,
            work_state: "KA".to_string(),
            uan: Some("   ".to_string()),
            esi_number: Some(" 3100123456 ".to_string()),
            pan: None,
            pf_enrolled: true,
        };
        assert_eq!(employee.uan(), None);
        assert_eq!(employee.esi_number(), Some("3100123456"));
    }
}
