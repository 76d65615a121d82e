//! Environment-driven configuration, grounded on the teacher's
//! `config/mod.rs` shape but sourced from environment variables via
//! `figment` instead of a TOML file, per the deployment model this service
//! targets (container env vars, not a config file on disk).

use std::collections::HashMap;

use figment::providers::Env;
use figment::Figment;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BudgetConfig, ProcureError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelProviderConfig {
    #[serde(default = "default_provider")]
    pub llm_provider: String,
    #[serde(default)]
    pub llm_api_base: Option<String>,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub llm_model: String,
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(flatten)]
    pub model_provider: ModelProviderConfig,
    #[serde(default = "default_total_budget")]
    pub context_budget_total: u32,
    #[serde(default = "default_policy_share")]
    pub context_policy_share: f64,
    #[serde(default = "default_domain_share")]
    pub context_domain_share: f64,
    #[serde(default = "default_session_share")]
    pub context_session_share: f64,
    #[serde(default = "default_ephemeral_share")]
    pub context_ephemeral_share: f64,
    #[serde(default = "default_variance_threshold")]
    pub variance_threshold: f64,
    #[serde(default = "default_true")]
    pub auto_revision_enabled: bool,
    #[serde(default = "default_true")]
    pub audit_logging_enabled: bool,
    /// `CATEGORY:AMOUNT,CATEGORY:AMOUNT` pairs, e.g. `software:50000,hardware:100000`.
    #[serde(default)]
    pub budget_thresholds: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_total_budget() -> u32 {
    2000
}
fn default_policy_share() -> f64 {
    0.25
}
fn default_domain_share() -> f64 {
    0.25
}
fn default_session_share() -> f64 {
    0.40
}
fn default_ephemeral_share() -> f64 {
    0.10
}
fn default_variance_threshold() -> f64 {
    0.20
}
fn default_true() -> bool {
    true
}

impl ServiceConfig {
    /// Load from process environment variables (`LLM_PROVIDER`,
    /// `CONTEXT_BUDGET_TOTAL`, etc). Falls back to documented defaults for
    /// anything unset.
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Env::raw())
            .extract()
            .map_err(|e| ProcureError::config(format!("failed to load configuration: {e}")))
    }

    pub fn budget_config(&self) -> Result<BudgetConfig> {
        let budget = BudgetConfig {
            total_budget: self.context_budget_total,
            policy_share: self.context_policy_share,
            domain_share: self.context_domain_share,
            session_share: self.context_session_share,
            ephemeral_share: self.context_ephemeral_share,
        };
        if !budget.shares_valid() {
            return Err(ProcureError::config(
                "CONTEXT_*_SHARE values must sum to 1.0 within a 0.001 tolerance",
            ));
        }
        Ok(budget)
    }

    /// Parse `budget_thresholds` into a category -> amount map, falling back
    /// to the policy catalog defaults for any category left unset.
    pub fn parse_budget_thresholds(&self) -> Result<HashMap<String, Decimal>> {
        let mut thresholds: HashMap<String, Decimal> = crate::policy::catalog::default_budget_thresholds()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Decimal::from(v)))
            .collect();

        if let Some(raw) = &self.budget_thresholds {
            for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
                let (category, amount) = pair.split_once(':').ok_or_else(|| {
                    ProcureError::config(format!("invalid BUDGET_THRESHOLDS entry: '{pair}'"))
                })?;
                let amount: Decimal = amount.trim().parse().map_err(|_| {
                    ProcureError::config(format!("invalid amount in BUDGET_THRESHOLDS entry: '{pair}'"))
                })?;
                thresholds.insert(category.trim().to_string(), amount);
            }
        }
        Ok(thresholds)
    }
}
