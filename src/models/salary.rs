//! Salary structure model.
//!
//! Salary structures are versioned and effective-dated per employee. The
//! engine validates two invariants: basic pay is at least half of gross, and
//! an employee has at most one open-ended structure at a time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::money::Paise;

/// The income-tax regime the employee has opted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// The old regime with exemptions.
    Old,
    /// The new (default) concessional regime.
    New,
}

impl TaxRegime {
    /// Returns the configuration key for the regime.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegime::Old => "old",
            TaxRegime::New => "new",
        }
    }
}

/// Monthly salary components, in paise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryComponents {
    /// Basic pay.
    pub basic: Paise,
    /// House rent allowance.
    pub hra: Paise,
    /// Special allowance.
    pub special_allowance: Paise,
    /// Leave travel allowance.
    pub lta: Paise,
    /// Medical allowance.
    pub medical: Paise,
    /// Conveyance allowance.
    pub conveyance: Paise,
    /// Any other allowances.
    pub other_allowances: Paise,
}

impl SalaryComponents {
    /// Returns the sum of all components.
    pub fn gross(&self) -> Paise {
        self.basic
            + self.hra
            + self.special_allowance
            + self.lta
            + self.medical
            + self.conveyance
            + self.other_allowances
    }

    /// Applies `f` to every component.
    pub fn map(&self, f: impl Fn(Paise) -> Paise) -> Self {
        Self {
            basic: f(self.basic),
            hra: f(self.hra),
            special_allowance: f(self.special_allowance),
            lta: f(self.lta),
            medical: f(self.medical),
            conveyance: f(self.conveyance),
            other_allowances: f(self.other_allowances),
        }
    }

    fn all(&self) -> [(&'static str, Paise); 7] {
        [
            ("basic", self.basic),
            ("hra", self.hra),
            ("special_allowance", self.special_allowance),
            ("lta", self.lta),
            ("medical", self.medical),
            ("conveyance", self.conveyance),
            ("other_allowances", self.other_allowances),
        ]
    }
}

/// A versioned, effective-dated salary structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryStructure {
    /// The employee this structure belongs to.
    pub employee_id: String,
    /// Monotonic version number per employee.
    pub version: u32,
    /// First day the structure applies.
    pub effective_from: NaiveDate,
    /// Last day the structure applies; `None` means open-ended.
    pub effective_to: Option<NaiveDate>,
    /// Monthly components.
    pub components: SalaryComponents,
    /// Selected tax regime.
    pub tax_regime: TaxRegime,
}

impl SalaryStructure {
    /// Returns the monthly gross.
    pub fn gross(&self) -> Paise {
        self.components.gross()
    }

    /// Returns true if the structure applies on the given date.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.is_none_or(|to| date <= to)
    }

    /// Validates a single structure.
    ///
    /// Components must be non-negative, the date range must not be inverted,
    /// and basic must be at least 50% of gross.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, amount) in self.components.all() {
            if amount.is_negative() {
                return Err(EngineError::validation(
                    name,
                    format!("must not be negative, got {}", amount),
                ));
            }
        }

        if let Some(to) = self.effective_to {
            if to < self.effective_from {
                return Err(EngineError::validation(
                    "effective_to",
                    format!("{} is before effective_from {}", to, self.effective_from),
                ));
            }
        }

        let gross = self.gross();
        if self.components.basic.value() * 2 < gross.value() {
            return Err(EngineError::validation(
                "basic",
                format!(
                    "basic {} is below 50% of gross {}",
                    self.components.basic, gross
                ),
            ));
        }

        Ok(())
    }

    /// Validates an employee's structure history.
    ///
    /// Every structure must be valid on its own, at most one may be
    /// open-ended, and effective ranges must not overlap.
    pub fn validate_history(structures: &[SalaryStructure]) -> EngineResult<()> {
        for structure in structures {
            structure.validate()?;
        }

        let open_ended = structures
            .iter()
            .filter(|s| s.effective_to.is_none())
            .count();
        if open_ended > 1 {
            return Err(EngineError::validation(
                "effective_to",
                format!("{} open-ended salary structures, at most one allowed", open_ended),
            ));
        }

        let mut sorted: Vec<&SalaryStructure> = structures.iter().collect();
        sorted.sort_by_key(|s| s.effective_from);
        for pair in sorted.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let overlaps = earlier
                .effective_to
                .is_none_or(|to| to >= later.effective_from);
            if overlaps {
                return Err(EngineError::validation(
                    "effective_from",
                    format!(
                        "version {} overlaps version {}",
                        later.version, earlier.version
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Selects the structure effective on `as_of`, preferring the highest version.
    pub fn effective_on(structures: &[SalaryStructure], as_of: NaiveDate) -> Option<&SalaryStructure> {
        structures
            .iter()
            .filter(|s| s.is_effective_on(as_of))
            .max_by_key(|s| s.version)
    }
}
