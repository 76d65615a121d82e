//! Agent-specific request payloads and their validation rules.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{Validator, ValidationError};

static QUARTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q([1-4]) (\d{4})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationPayload {
    pub vendor: String,
    /// Fraction in [0,1]. Values >1 on input are treated as a percent and
    /// divided by 100 exactly once by `normalize_discount`.
    pub target_discount: f64,
    pub category: String,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub contract_duration: Option<String>,
    #[serde(default)]
    pub volume_commitment: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

impl NegotiationPayload {
    /// Normalize `target_discount` exactly once: values >1 are assumed to be
    /// a percent (e.g. 25.0 meaning 25%) and divided by 100. A
    /// pre-normalized fraction (0.15) is left untouched. Idempotent: calling
    /// this on an already-normalized value is a no-op because the result is
    /// always <= 1.0 after the first call.
    pub fn normalize_discount(&self) -> Result<f64, ValidationError> {
        let raw = self.target_discount;
        if raw.is_nan() || raw < 0.0 {
            return Err(ValidationError::single(
                "target_discount",
                "target_discount must be a non-negative number",
            ));
        }
        let normalized = if raw > 1.0 { raw / 100.0 } else { raw };
        if normalized > 1.0 {
            return Err(ValidationError::single(
                "target_discount",
                "target_discount exceeds 100% even after percent normalization",
            ));
        }
        Ok(normalized)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.require(!self.vendor.trim().is_empty(), "vendor", "vendor must not be empty");
        v.require(!self.category.trim().is_empty(), "category", "category must not be empty");
        if let Some(price) = self.current_price {
            v.require(price >= Decimal::ZERO, "current_price", "current_price must be >= 0");
        }
        v.finish()?;
        self.normalize_discount()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompliancePayload {
    pub clause: String,
    #[serde(default)]
    pub contract_context: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub risk_tolerance: Option<RiskTolerance>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl CompliancePayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.require(!self.clause.trim().is_empty(), "clause", "clause must not be empty");
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub category: String,
    /// Must match `Q[1-4] YYYY` with YYYY in [current_year, current_year+5].
    pub quarter: String,
    pub planned_spend: Decimal,
    #[serde(default)]
    pub current_budget: Option<Decimal>,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub strategic_priority: Option<String>,
}

impl ForecastPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.require(!self.category.trim().is_empty(), "category", "category must not be empty");
        v.require(
            self.planned_spend >= Decimal::ZERO,
            "planned_spend",
            "planned_spend must be >= 0",
        );
        if let Some(budget) = self.current_budget {
            v.require(budget >= Decimal::ZERO, "current_budget", "current_budget must be >= 0");
        }
        v.finish()?;
        self.validate_quarter()
    }

    fn validate_quarter(&self) -> Result<(), ValidationError> {
        let caps = QUARTER_RE.captures(self.quarter.trim()).ok_or_else(|| {
            ValidationError::single(
                "quarter",
                "quarter must match the form 'Q[1-4] YYYY'",
            )
        })?;
        let year: i32 = caps[2].parse().map_err(|_| {
            ValidationError::single("quarter", "quarter year is not a valid number")
        })?;
        let current_year = chrono::Utc::now().year();
        if year < current_year || year > current_year + 5 {
            return Err(ValidationError::single(
                "quarter",
                format!(
                    "quarter year {} is out of the allowed range [{}, {}]",
                    year,
                    current_year,
                    current_year + 5
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_input_normalized_once() {
        let payload = NegotiationPayload {
            vendor: "Acme".into(),
            target_discount: 25.0,
            category: "software".into(),
            current_price: None,
            contract_duration: None,
            volume_commitment: None,
            extra: None,
        };
        assert_eq!(payload.normalize_discount().unwrap(), 0.25);
    }

    #[test]
    fn pre_normalized_fraction_untouched() {
        let payload = NegotiationPayload {
            vendor: "Acme".into(),
            target_discount: 0.15,
            category: "software".into(),
            current_price: None,
            contract_duration: None,
            volume_commitment: None,
            extra: None,
        };
        assert_eq!(payload.normalize_discount().unwrap(), 0.15);
    }

    #[test]
    fn quarter_out_of_range_rejected() {
        let payload = ForecastPayload {
            category: "software".into(),
            quarter: "Q3 2099".into(),
            planned_spend: dec!(200000),
            current_budget: None,
            justification: None,
            strategic_priority: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn quarter_in_range_accepted() {
        let year = chrono::Utc::now().year() + 1;
        let payload = ForecastPayload {
            category: "software".into(),
            quarter: format!("Q3 {}", year),
            planned_spend: dec!(200000),
            current_budget: None,
            justification: None,
            strategic_priority: None,
        };
        assert!(payload.validate().is_ok());
    }
}
