//! Shared agent trait and the three specialist implementations, grounded on
//! `agents/mod.rs`'s `Agent` trait, generalized from a single
//! input/output pair to the three payload/output pairs this system routes.

pub mod compliance;
pub mod forecast;
pub mod model_client;
pub mod negotiation;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AgentPayload;

pub use compliance::ComplianceAgent;
pub use forecast::ForecastAgent;
pub use model_client::{ModelClient, MockModelClient};
pub use negotiation::NegotiationAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid payload for this agent: {0}")]
    InvalidPayload(String),
    #[error("model client error: {0}")]
    ModelClient(#[from] anyhow::Error),
}

/// Static description of what an agent does, returned by `/status/agents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub agent_id: String,
    pub version: &'static str,
    pub description: &'static str,
}

/// Lifetime counters an agent tracks about its own invocations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub total_invocations: u64,
    pub total_failures: u64,
}

/// What an agent hands back before the critic ever sees it: the drafted
/// text plus the agent's own self-reported confidence. Negotiation and
/// Compliance use different penalty systems to compute this value; the
/// orchestrator treats it as opaque.
#[derive(Debug, Clone)]
pub struct AgentArtifact {
    pub text: String,
    pub confidence: f64,
}

/// Common behavior every specialist agent implements. The orchestrator
/// drives agents purely through this trait, never through a concrete type.
#[async_trait]
pub trait Agent: Send + Sync {
    fn validate_payload(&self, payload: &AgentPayload) -> Result<(), AgentError>;

    /// Produce the agent's artifact for this payload, given the Domain and
    /// Session/Ephemeral context already assembled upstream. Post-processing
    /// (warranty injection, risk tiering, etc) happens here, before the
    /// critic ever runs.
    async fn process(&self, payload: &AgentPayload, context_summary: &str) -> Result<AgentArtifact, AgentError>;

    fn report_capabilities(&self) -> AgentCapabilities;

    fn report_metrics(&self) -> AgentMetrics;
}
