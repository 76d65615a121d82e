//! Workflow Orchestrator: drives one request through context assembly, the
//! target agent, and the critic, and assembles the final `WorkflowResult`.
//! Grounded on the teacher's `Agent::execute`/`create_decision_event` flow,
//! generalized across the three specialist agents.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::agents::{Agent, AgentError};
use crate::context::{ContextAssembler, SessionState};
use crate::critic::GlobalPolicyCritic;
use crate::domain::context::LayeredContext;
use crate::domain::{
    AgentKind, AgentPayload, BudgetConfig, ContextUsage, FinalStatus, RequestEnvelope, RevisionAction,
    WorkflowMetrics, WorkflowResult,
};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
}

pub struct WorkflowOrchestrator {
    negotiation: Arc<dyn Agent>,
    compliance: Arc<dyn Agent>,
    forecast: Arc<dyn Agent>,
    context_assembler: Arc<ContextAssembler>,
    critic: Arc<GlobalPolicyCritic>,
    budget: BudgetConfig,
}

impl WorkflowOrchestrator {
    pub fn new(
        negotiation: Arc<dyn Agent>,
        compliance: Arc<dyn Agent>,
        forecast: Arc<dyn Agent>,
        context_assembler: Arc<ContextAssembler>,
        critic: Arc<GlobalPolicyCritic>,
        budget: BudgetConfig,
    ) -> Self {
        Self { negotiation, compliance, forecast, context_assembler, critic, budget }
    }

    fn agent_for(&self, kind: AgentKind) -> &Arc<dyn Agent> {
        match kind {
            AgentKind::Negotiation => &self.negotiation,
            AgentKind::Compliance => &self.compliance,
            AgentKind::Forecast => &self.forecast,
        }
    }

    /// Run the full pipeline for one validated envelope. Never panics on
    /// agent/critic failure; converts it into an error `WorkflowResult`
    /// instead, so the caller always gets a result to report.
    pub async fn run(&self, envelope: &RequestEnvelope, session: &SessionState) -> WorkflowResult {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let kind = envelope.payload.kind();

        if let Err(e) = envelope.validate() {
            return self.error_result(request_id, kind, envelope.payload.clone(), e.to_string(), started);
        }

        let (ctx, _pruning) = self.context_assembler.build(kind, &envelope.payload, session);
        let context_summary = Self::summarize(&ctx);

        let agent = self.agent_for(kind);
        if let Err(e) = agent.validate_payload(&envelope.payload) {
            return self.error_result(request_id, kind, envelope.payload.clone(), e.to_string(), started);
        }

        let agent_started = Instant::now();
        let artifact = match agent.process(&envelope.payload, &context_summary).await {
            Ok(artifact) => artifact,
            Err(e) => {
                return self.error_result(request_id, kind, envelope.payload.clone(), e.to_string(), started);
            }
        };
        let raw_artifact = artifact.text;
        let agent_confidence = artifact.confidence;
        let agent_ms = agent_started.elapsed().as_millis() as u64;

        let budget_context = Self::budget_context(&envelope.payload);
        let critic_started = Instant::now();
        let critic_outcome = self.critic.review(&raw_artifact, ctx.critic_view(), budget_context);
        let critic_ms = critic_started.elapsed().as_millis() as u64;

        let final_text = critic_outcome.final_text(&raw_artifact).to_string();
        let final_status = Self::map_final_status(critic_outcome.action_taken);

        let metrics = WorkflowMetrics {
            agent_ms,
            critic_ms,
            total_ms: started.elapsed().as_millis() as u64,
            context_usage: ContextUsage {
                policy_tokens: ctx.policy.token_count,
                domain_tokens: ctx.domain.token_count,
                session_tokens: ctx.session.token_count,
                ephemeral_tokens: ctx.ephemeral.token_count,
                total_tokens: ctx.total_tokens(),
            },
            policy_checks_performed: 4,
            violations_detected: critic_outcome.violations.len() as u32,
            auto_revisions_applied: u32::from(critic_outcome.action_taken == RevisionAction::AutoRevised),
        };

        WorkflowResult {
            request_id,
            agent_kind: kind,
            payload: envelope.payload.clone(),
            raw_artifact,
            agent_confidence,
            critic: Some(critic_outcome),
            final_text,
            final_status,
            metrics,
            timestamp: Utc::now(),
            success: true,
            error_message: None,
        }
    }

    fn budget_context(payload: &AgentPayload) -> Option<(&str, rust_decimal::Decimal)> {
        match payload {
            AgentPayload::Forecast(p) => Some((p.category.as_str(), p.planned_spend)),
            _ => None,
        }
    }

    fn map_final_status(action: RevisionAction) -> FinalStatus {
        match action {
            RevisionAction::Approved => FinalStatus::Compliant,
            RevisionAction::AutoRevised => FinalStatus::Revised,
            RevisionAction::ManualReviewRequired => FinalStatus::Flagged,
            RevisionAction::Rejected => FinalStatus::NonCompliant,
        }
    }

    fn summarize(ctx: &LayeredContext) -> String {
        let mut lines = Vec::new();
        for okr in &ctx.policy.enterprise_okrs {
            lines.push(format!("OKR: {okr}"));
        }
        for guardrail in &ctx.policy.compliance_guardrails {
            lines.push(format!("Guardrail: {guardrail}"));
        }
        for playbook in &ctx.domain.category_playbooks {
            lines.push(format!("Playbook: {playbook}"));
        }
        for pattern in &ctx.domain.historical_patterns {
            lines.push(format!("History: {pattern}"));
        }
        lines.join("\n")
    }

    fn error_result(
        &self,
        request_id: Uuid,
        kind: AgentKind,
        payload: AgentPayload,
        message: String,
        started: Instant,
    ) -> WorkflowResult {
        WorkflowResult {
            request_id,
            agent_kind: kind,
            payload,
            raw_artifact: String::new(),
            agent_confidence: 0.0,
            critic: None,
            final_text: String::new(),
            final_status: FinalStatus::Error,
            metrics: WorkflowMetrics {
                total_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            },
            timestamp: Utc::now(),
            success: false,
            error_message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::model_client::MockModelClient;
    use crate::agents::{ComplianceAgent, ForecastAgent, NegotiationAgent};
    use crate::domain::{NegotiationPayload, Priority};
    use crate::policy::PolicyStore;

    fn orchestrator() -> WorkflowOrchestrator {
        let model: Arc<dyn crate::agents::ModelClient> = Arc::new(MockModelClient);
        let policy = Arc::new(PolicyStore::from_defaults());
        let context_assembler = Arc::new(ContextAssembler::new(policy.clone(), BudgetConfig::default()));
        let critic = Arc::new(GlobalPolicyCritic::new(policy.clone()));
        WorkflowOrchestrator::new(
            Arc::new(NegotiationAgent::new(model.clone())),
            Arc::new(ComplianceAgent::new(model.clone(), policy.clone())),
            Arc::new(ForecastAgent::new(model, policy)),
            context_assembler,
            critic,
            BudgetConfig::default(),
        )
    }

    fn envelope() -> RequestEnvelope {
        RequestEnvelope {
            session_id: "sess-1".into(),
            priority: Priority::Normal,
            payload: AgentPayload::Negotiation(NegotiationPayload {
                vendor: "Acme".into(),
                target_discount: 0.3,
                category: "software".into(),
                current_price: None,
                contract_duration: None,
                volume_commitment: None,
                extra: None,
            }),
            user_context: None,
        }
    }

    #[tokio::test]
    async fn successful_run_produces_compliant_or_revised_result() {
        let orchestrator = orchestrator();
        let result = orchestrator.run(&envelope(), &SessionState::default()).await;
        assert!(result.success);
        assert!(matches!(result.final_status, FinalStatus::Compliant | FinalStatus::Revised));
    }

    #[tokio::test]
    async fn invalid_envelope_produces_error_result() {
        let orchestrator = orchestrator();
        let mut bad = envelope();
        bad.session_id = "   ".into();
        let result = orchestrator.run(&bad, &SessionState::default()).await;
        assert!(!result.success);
        assert_eq!(result.final_status, FinalStatus::Error);
    }
}
