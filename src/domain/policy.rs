//! Policy violation and compliance rule entities shared by the validator,
//! critic, and API layers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used by the critic's compliance-score formula.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Low => 0.1,
            Self::Medium => 0.3,
            Self::High => 0.6,
            Self::Critical => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    ProhibitedClause,
    MissingRequiredClause,
    MissingWarranty,
    UnauthorizedDiscount,
    BudgetExceeded,
    BudgetThresholdExceeded,
}

/// Where a violation was found: either a byte offset range in the text, or
/// the name of a context layer for layer-scoped findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Location {
    Offset { start: usize, end: usize },
    Layer { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    Warning,
    Error,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: String,
    pub description: String,
    pub category: String,
    pub enforcement_level: EnforcementLevel,
}
