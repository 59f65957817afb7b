//! Ledger configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::*;
use crate::utils::validation::MAX_MINOR_UNIT_SCALE;

/// Account-code prefixes used to group the profit and loss statement.
///
/// Revenue accounts outside `operating_revenue_prefix` are reported as other
/// income; expense accounts outside the COGS and operating prefixes as other
/// expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportClassification {
    /// Pendapatan
    pub operating_revenue_prefix: String,
    /// HPP
    pub cogs_prefix: String,
    /// Beban Operasional
    pub operating_expense_prefix: String,
}

impl Default for ReportClassification {
    fn default() -> Self {
        Self {
            operating_revenue_prefix: "4".into(),
            cogs_prefix: "5".into(),
            operating_expense_prefix: "6".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Equity account that absorbs net income at period close
    pub retained_earnings_code: String,
    /// Decimal digits of the minor currency unit
    pub minor_unit_scale: u32,
    /// How long a mutation may wait for the write lock
    pub write_timeout_ms: u64,
    pub classification: ReportClassification,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retained_earnings_code: "3200".into(),
            minor_unit_scale: 2,
            write_timeout_ms: 5_000,
            classification: ReportClassification::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON; missing keys fall back to defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.retained_earnings_code.trim().is_empty() {
            return Err(LedgerError::Config(
                "retained_earnings_code cannot be empty".to_string(),
            ));
        }
        if self.minor_unit_scale > MAX_MINOR_UNIT_SCALE {
            return Err(LedgerError::Config(format!(
                "minor_unit_scale must be at most {}",
                MAX_MINOR_UNIT_SCALE
            )));
        }
        if self.write_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "write_timeout_ms must be positive".to_string(),
            ));
        }
        let prefixes = &self.classification;
        if prefixes.operating_revenue_prefix.is_empty()
            || prefixes.cogs_prefix.is_empty()
            || prefixes.operating_expense_prefix.is_empty()
        {
            return Err(LedgerError::Config(
                "classification prefixes cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json_str(r#"{"retained_earnings_code": "3300"}"#).unwrap();
        assert_eq!(config.retained_earnings_code, "3300");
        assert_eq!(config.minor_unit_scale, 2);
        assert_eq!(config.classification.cogs_prefix, "5");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            LedgerConfig::from_json_str(r#"{"minor_unit_scale": 9}"#),
            Err(LedgerError::Config(_))
        ));
        assert!(LedgerConfig::from_json_str(r#"{"write_timeout_ms": 0}"#).is_err());
        assert!(LedgerConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"write_timeout_ms": 250, "classification": {{"cogs_prefix": "51"}}}}"#
        )
        .unwrap();

        let config = LedgerConfig::load(file.path()).unwrap();
        assert_eq!(config.write_timeout(), Duration::from_millis(250));
        assert_eq!(config.classification.cogs_prefix, "51");
        assert_eq!(config.classification.operating_revenue_prefix, "4");
    }
}
