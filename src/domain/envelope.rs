//! Request envelope: the agent kind, session identity, priority, and payload
//! that enters the system at one of the three `/agent/*` endpoints.

use serde::{Deserialize, Serialize};

use super::payloads::{CompliancePayload, ForecastPayload, NegotiationPayload};
use super::validation::{Validator, ValidationError};

/// Which specialist agent a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Negotiation,
    Compliance,
    Forecast,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negotiation => write!(f, "negotiation"),
            Self::Compliance => write!(f, "compliance"),
            Self::Forecast => write!(f, "forecast"),
        }
    }
}

/// Request priority. Carried through for audit/metrics; does not change
/// orchestration semantics in this design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Per-agent payload, tagged so a single envelope type can flow through the
/// orchestrator regardless of which agent it targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "agent", rename_all = "snake_case")]
pub enum AgentPayload {
    Negotiation(NegotiationPayload),
    Compliance(CompliancePayload),
    Forecast(ForecastPayload),
}

impl AgentPayload {
    pub fn kind(&self) -> AgentKind {
        match self {
            Self::Negotiation(_) => AgentKind::Negotiation,
            Self::Compliance(_) => AgentKind::Compliance,
            Self::Forecast(_) => AgentKind::Forecast,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Negotiation(p) => Some(&p.category),
            Self::Compliance(_) => None,
            Self::Forecast(p) => Some(&p.category),
        }
    }
}

/// The envelope that enters the system for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub session_id: String,
    #[serde(default)]
    pub priority: Priority,
    pub payload: AgentPayload,
    #[serde(default)]
    pub user_context: Option<String>,
}

impl RequestEnvelope {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.require(
            !self.session_id.trim().is_empty(),
            "session_id",
            "session_id must not be empty",
        );
        v.finish()?;

        match &self.payload {
            AgentPayload::Negotiation(p) => p.validate(),
            AgentPayload::Compliance(p) => p.validate(),
            AgentPayload::Forecast(p) => p.validate(),
        }
    }
}
