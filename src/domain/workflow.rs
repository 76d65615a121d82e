//! Workflow result: what the orchestrator hands back after running an
//! agent and the critic for one request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::{AgentKind, AgentPayload};
use super::policy::PolicyViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionAction {
    Approved,
    AutoRevised,
    ManualReviewRequired,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Compliant,
    Revised,
    Flagged,
    NonCompliant,
    Error,
}

/// Per-layer and total token usage for one assembled context.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextUsage {
    pub policy_tokens: u32,
    pub domain_tokens: u32,
    pub session_tokens: u32,
    pub ephemeral_tokens: u32,
    pub total_tokens: u32,
}

/// The critic's independent second pass over an agent's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticOutcome {
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_text: Option<String>,
    pub violations: Vec<PolicyViolation>,
    pub action_taken: RevisionAction,
    pub compliance_score: f64,
    pub notes: Vec<String>,
    pub processing_time_ms: u64,
}

impl CriticOutcome {
    pub fn final_text<'a>(&'a self, raw: &'a str) -> &'a str {
        self.revised_text.as_deref().unwrap_or(raw)
    }
}

/// Per-stage timing and token accounting for one workflow run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub agent_ms: u64,
    pub critic_ms: u64,
    pub total_ms: u64,
    pub context_usage: ContextUsage,
    pub policy_checks_performed: u32,
    pub violations_detected: u32,
    pub auto_revisions_applied: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub request_id: Uuid,
    pub agent_kind: AgentKind,
    pub payload: AgentPayload,
    pub raw_artifact: String,
    /// The agent's own self-reported confidence, distinct from the critic's
    /// `compliance_score`. Absent on error results.
    pub agent_confidence: f64,
    pub critic: Option<CriticOutcome>,
    pub final_text: String,
    pub final_status: FinalStatus,
    pub metrics: WorkflowMetrics,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
