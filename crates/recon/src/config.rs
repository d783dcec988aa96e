use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Match config
// ---------------------------------------------------------------------------

/// Tolerance knobs for the matcher.
///
/// Percent tolerances are fractions: `amount_tolerance_percent = 0.01` accepts
/// amounts within 1% of the bank amount. Any field left out of a TOML document
/// takes its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub amount_tolerance_percent: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_tolerance_absolute: Decimal,
    pub date_tolerance_days: u32,
    pub counterparty_similarity_threshold: f64,
    /// Reserved; descriptions are not scored.
    pub description_similarity_threshold: f64,
    pub enable_fuzzy_matching: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_percent: 0.0,
            amount_tolerance_absolute: Decimal::ZERO,
            date_tolerance_days: 0,
            counterparty_similarity_threshold: 0.8,
            description_similarity_threshold: 0.6,
            enable_fuzzy_matching: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.amount_tolerance_percent.is_finite() || self.amount_tolerance_percent < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance_percent must be a non-negative number, got {}",
                self.amount_tolerance_percent
            )));
        }

        if self.amount_tolerance_absolute < Decimal::ZERO {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance_absolute must be non-negative, got {}",
                self.amount_tolerance_absolute
            )));
        }

        for (name, value) in [
            (
                "counterparty_similarity_threshold",
                self.counterparty_similarity_threshold,
            ),
            (
                "description_similarity_threshold",
                self.description_similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
