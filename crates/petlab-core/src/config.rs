//! Laboratory configuration.

use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LabError, LabResult};

/// Tunable constants for billing, reporting, and code generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabConfig {
    /// VAT applied to invoice subtotals
    pub tax_rate: Decimal,
    /// Sample-to-delivery target for the turnaround KPI
    pub turnaround_target_hours: f64,
    /// Upper bound for the repeat-test KPI, in percent
    pub repeat_rate_target_percent: f64,
    /// Lower bound for the same-day completion KPI, in percent
    pub same_day_target_percent: f64,
    pub invoice_prefix: String,
    pub sample_code_prefix: String,
    pub payment_prefix: String,
    pub default_appointment_minutes: u32,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            turnaround_target_hours: 12.0,
            repeat_rate_target_percent: 5.0,
            same_day_target_percent: 70.0,
            invoice_prefix: "F".into(),
            sample_code_prefix: "TM".into(),
            payment_prefix: "PAG".into(),
            default_appointment_minutes: 30,
        }
    }
}

impl LabConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: LabConfig =
            serde_json::from_str(json).context("invalid laboratory configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> LabResult<()> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(LabError::validation("tax_rate must be in [0, 1)"));
        }
        if self.turnaround_target_hours <= 0.0
            || self.repeat_rate_target_percent <= 0.0
            || self.same_day_target_percent <= 0.0
        {
            return Err(LabError::validation("KPI targets must be positive"));
        }
        if self.invoice_prefix.trim().is_empty()
            || self.sample_code_prefix.trim().is_empty()
            || self.payment_prefix.trim().is_empty()
        {
            return Err(LabError::validation("code prefixes cannot be empty"));
        }
        if self.default_appointment_minutes == 0 {
            return Err(LabError::validation(
                "default_appointment_minutes must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LabConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax_rate, Decimal::new(18, 2));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LabConfig::from_json_str(r#"{"invoice_prefix": "B"}"#).unwrap();
        assert_eq!(config.invoice_prefix, "B");
        assert_eq!(config.sample_code_prefix, "TM");
        assert_eq!(config.turnaround_target_hours, 12.0);
    }

    #[test]
    fn test_rejects_bad_tax_rate() {
        assert!(LabConfig::from_json_str(r#"{"tax_rate": "1.5"}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_appointment_minutes": 45}}"#).unwrap();

        let config = LabConfig::load(file.path()).unwrap();
        assert_eq!(config.default_appointment_minutes, 45);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = LabConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
