//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading statutory
//! configurations from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::TaxRegime;

use super::types::{
    DeadlinesConfig, EsiConfig, Establishment, IncomeTaxConfig, PayrollSettings,
    ProfessionalTaxConfig, ProvidentFundConfig, StatutoryConfig, TaxRegimeConfig,
};

/// Loads and provides access to statutory configuration.
///
/// # Directory Structure
///
/// ```text
/// config/india/
/// ├── establishment.yaml     # Employer codes for filings
/// ├── provident_fund.yaml    # PF rates, wage ceiling, EPS cap
/// ├── esi.yaml               # ESI rates and eligibility ceiling
/// ├── professional_tax.yaml  # State slabs
/// ├── income_tax.yaml        # Regime tables by financial year
/// ├── deadlines.yaml         # Filing due-date rules
/// └── payroll.yaml           # Orchestrator settings (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/india")?;
/// println!("Establishment: {}", loader.config().establishment().name);
/// # Ok::<(), payroll_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: StatutoryConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if a required file is missing, contains invalid YAML,
    /// or describes inconsistent slabs.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let establishment = Self::load_yaml::<Establishment>(&path.join("establishment.yaml"))?;
        let provident_fund =
            Self::load_yaml::<ProvidentFundConfig>(&path.join("provident_fund.yaml"))?;
        let esi = Self::load_yaml::<EsiConfig>(&path.join("esi.yaml"))?;

        let pt_path = path.join("professional_tax.yaml");
        let professional_tax = Self::load_yaml::<ProfessionalTaxConfig>(&pt_path)?;
        Self::validate_professional_tax(&professional_tax, &pt_path)?;

        let it_path = path.join("income_tax.yaml");
        let income_tax = Self::load_yaml::<IncomeTaxConfig>(&it_path)?;
        Self::validate_income_tax(&income_tax, &it_path)?;

        let deadlines = Self::load_yaml::<DeadlinesConfig>(&path.join("deadlines.yaml"))?;

        // payroll.yaml is optional; defaults apply when absent
        let payroll_path = path.join("payroll.yaml");
        let payroll = if payroll_path.exists() {
            Self::load_yaml::<PayrollSettings>(&payroll_path)?
        } else {
            PayrollSettings::default()
        };

        let config = StatutoryConfig::new(
            establishment,
            provident_fund,
            esi,
            professional_tax,
            income_tax,
            deadlines,
            payroll,
        );

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn validate_professional_tax(config: &ProfessionalTaxConfig, path: &Path) -> EngineResult<()> {
        for slab in &config.slabs {
            if let Some(to) = slab.salary_to {
                if to <= slab.salary_from {
                    return Err(parse_error(
                        path,
                        format!(
                            "{} slab from {} has salary_to {} not above salary_from",
                            slab.state, slab.salary_from, to
                        ),
                    ));
                }
            }
            if slab.month.is_some_and(|m| !(1..=12).contains(&m)) {
                return Err(parse_error(
                    path,
                    format!("{} slab has invalid month {:?}", slab.state, slab.month),
                ));
            }
            if slab.amount.is_negative() {
                return Err(parse_error(path, format!("{} slab has negative amount", slab.state)));
            }
        }
        Ok(())
    }

    fn validate_income_tax(config: &IncomeTaxConfig, path: &Path) -> EngineResult<()> {
        for table in &config.regimes {
            let label = format!("{} regime from FY {}", table.regime.as_str(), table.effective_from_fy);
            let Some(first) = table.slabs.first() else {
                return Err(parse_error(path, format!("{} has no slabs", label)));
            };
            if !first.from.is_zero() {
                return Err(parse_error(path, format!("{} must start at zero", label)));
            }
            for pair in table.slabs.windows(2) {
                if pair[0].to != Some(pair[1].from) {
                    return Err(parse_error(
                        path,
                        format!("{} slabs are not contiguous at {}", label, pair[1].from),
                    ));
                }
            }
            if table.slabs.last().is_some_and(|s| s.to.is_some()) {
                return Err(parse_error(path, format!("{} top slab must be open-ended", label)));
            }
        }
        Ok(())
    }

    /// Returns the underlying statutory configuration.
    pub fn config(&self) -> &StatutoryConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> StatutoryConfig {
        self.config
    }

    /// Gets the income-tax table for a regime and financial year.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use payroll_engine::config::ConfigLoader;
    /// use payroll_engine::models::TaxRegime;
    ///
    /// let loader = ConfigLoader::load("./config/india")?;
    /// let table = loader.get_tax_regime(TaxRegime::New, 2025)?;
    /// println!("Standard deduction: {}", table.standard_deduction);
    /// # Ok::<(), payroll_engine::error::EngineError>(())
    /// ```
    pub fn get_tax_regime(&self, regime: TaxRegime, fy_start_year: i32) -> EngineResult<&TaxRegimeConfig> {
        self.config
            .tax_regime_for(regime, fy_start_year)
            .ok_or_else(|| EngineError::ConfigNotFound {
                path: format!(
                    "income_tax.yaml ({} regime for FY {})",
                    regime.as_str(),
                    fy_start_year
                ),
            })
    }
}

fn parse_error(path: &Path, message: String) -> EngineError {
    EngineError::ConfigParseError {
        path: path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsufficientNetPayPolicy;
    use crate::models::DeadlineType;
    use crate::money::Paise;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/india"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert!(!loader.config().establishment().code.is_empty());
    }

    #[test]
    fn test_provident_fund_parameters() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let pf = loader.config().provident_fund();

        assert_eq!(pf.wage_ceiling, Paise::from_rupees(15_000));
        assert_eq!(pf.employee_rate, dec("12"));
        assert_eq!(pf.eps_rate, dec("8.33"));
        assert_eq!(pf.eps_monthly_cap, Paise::from_rupees(1_250));
    }

    #[test]
    fn test_esi_parameters() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let esi = loader.config().esi();

        assert_eq!(esi.employee_rate, dec("0.75"));
        assert_eq!(esi.employer_rate, dec("3.25"));
        assert_eq!(esi.eligibility_ceiling, Paise::from_rupees(21_000));
    }

    #[test]
    fn test_tax_regime_selected_by_financial_year() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let fy24 = loader.get_tax_regime(TaxRegime::New, 2024).unwrap();
        assert_eq!(fy24.rebate_threshold, Paise::from_rupees(700_000));

        let fy25 = loader.get_tax_regime(TaxRegime::New, 2025).unwrap();
        assert_eq!(fy25.rebate_threshold, Paise::from_rupees(1_200_000));
        assert_eq!(fy25.standard_deduction, Paise::from_rupees(75_000));

        let old = loader.get_tax_regime(TaxRegime::Old, 2026).unwrap();
        assert_eq!(old.standard_deduction, Paise::from_rupees(50_000));
    }

    #[test]
    fn test_tax_regime_before_any_table_is_not_found() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        match loader.get_tax_regime(TaxRegime::New, 2010) {
            Err(EngineError::ConfigNotFound { path }) => assert!(path.contains("2010")),
            other => panic!("Expected ConfigNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_deadline_rules_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rules = &loader.config().deadlines().rules;
        assert!(rules.iter().any(|r| r.deadline_type == DeadlineType::PfEcr));
        assert!(rules.iter().any(|r| r.deadline_type == DeadlineType::Form16));
    }

    #[test]
    fn test_payroll_settings_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let settings = loader.config().payroll();
        assert!(settings.max_concurrency >= 1);
        assert!(settings.retry.max_attempts >= 1);
        assert!(matches!(
            settings.loan_policy,
            InsufficientNetPayPolicy::MinimumNetPay { .. }
        ));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("establishment.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_non_contiguous_tax_slabs_rejected() {
        let yaml = r#"
statute_ref: "Income-tax Act"
cess_rate: "4"
regimes:
  - regime: new
    effective_from_fy: 2025
    standard_deduction: 7500000
    rebate_threshold: 120000000
    slabs:
      - { from: 0, to: 40000000, rate: "0" }
      - { from: 50000000, rate: "5" }
"#;
        let config: IncomeTaxConfig = serde_yaml::from_str(yaml).unwrap();
        let result = ConfigLoader::validate_income_tax(&config, Path::new("income_tax.yaml"));
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_inverted_pt_slab_rejected() {
        let yaml = r#"
slabs:
  - { state: MH, salary_from: 1000000, salary_to: 750000, amount: 17500 }
"#;
        let config: ProfessionalTaxConfig = serde_yaml::from_str(yaml).unwrap();
        let result =
            ConfigLoader::validate_professional_tax(&config, Path::new("professional_tax.yaml"));
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }
}
