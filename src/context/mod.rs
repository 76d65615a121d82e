//! Context Assembler: builds the four-layer context for a request and prunes
//! it to budget when it overflows, grounded on `context_manager.py`'s
//! `build_context`/`prune_context`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::context::{DomainLayer, EphemeralLayer, LayeredContext, SessionLayer};
use crate::domain::{AgentKind, AgentPayload, BudgetConfig, PruningReport, PruningStep};
use crate::policy::PolicyStore;
use crate::tokenizer::{self, ContentKind};

/// Caller-supplied session history. Distinct from the domain `SessionLayer`
/// because it's accumulated by the caller (API layer / session store) across
/// turns, not derived from a single request.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub conversation_turns: Vec<String>,
    pub tool_interactions: Vec<String>,
    pub session_findings: Vec<String>,
    pub user_preferences: HashMap<String, String>,
}

const SESSION_TURNS_KEPT: usize = 3;
const SESSION_TOOL_CALLS_KEPT: usize = 5;

pub struct ContextAssembler {
    policy: Arc<PolicyStore>,
    budget: BudgetConfig,
}

impl ContextAssembler {
    pub fn new(policy: Arc<PolicyStore>, budget: BudgetConfig) -> Self {
        Self { policy, budget }
    }

    /// Build the full layered context for one request, then prune it to
    /// budget if it overflows. Returns the (possibly pruned) context and a
    /// trace of what was removed.
    pub fn build(
        &self,
        agent_kind: AgentKind,
        payload: &AgentPayload,
        session: &SessionState,
    ) -> (LayeredContext, PruningReport) {
        let mut ctx = LayeredContext {
            policy: self.build_policy_layer(),
            domain: self.build_domain_layer(agent_kind, payload),
            session: self.build_session_layer(session),
            ephemeral: self.build_ephemeral_layer(payload),
        };
        let report = self.prune(&mut ctx);
        (ctx, report)
    }

    fn build_policy_layer(&self) -> crate::domain::context::PolicyLayer {
        self.policy.snapshot().layer.clone()
    }

    fn build_domain_layer(&self, agent_kind: AgentKind, payload: &AgentPayload) -> DomainLayer {
        let category = payload.category().unwrap_or("general");
        let mut layer = DomainLayer {
            category_playbooks: vec![format!(
                "{agent_kind} playbook for category '{category}': prefer multi-year commitments for volume discounts"
            )],
            vendor_guidelines: vec![format!(
                "Standard vendor guidelines apply to category '{category}'"
            )],
            market_intelligence: vec![format!(
                "Market conditions for '{category}' reviewed quarterly"
            )],
            historical_patterns: vec![format!(
                "Historical {agent_kind} outcomes for '{category}' trend toward incremental gains"
            )],
            token_count: 0,
        };
        layer.token_count = tokenizer::sum_sequence(&layer.category_playbooks, ContentKind::Plain)
            + tokenizer::sum_sequence(&layer.vendor_guidelines, ContentKind::Plain)
            + tokenizer::sum_sequence(&layer.market_intelligence, ContentKind::Plain)
            + tokenizer::sum_sequence(&layer.historical_patterns, ContentKind::Plain);
        layer
    }

    fn build_session_layer(&self, session: &SessionState) -> SessionLayer {
        let mut layer = SessionLayer {
            conversation_turns: session.conversation_turns.clone(),
            tool_interactions: session.tool_interactions.clone(),
            session_findings: session.session_findings.clone(),
            user_preferences: session.user_preferences.clone(),
            token_count: 0,
        };
        layer.token_count = Self::measure_session(&layer);
        layer
    }

    fn measure_session(layer: &SessionLayer) -> u32 {
        tokenizer::sum_sequence(&layer.conversation_turns, ContentKind::Plain)
            + tokenizer::sum_sequence(&layer.tool_interactions, ContentKind::Technical)
            + tokenizer::sum_sequence(&layer.session_findings, ContentKind::Plain)
            + tokenizer::sum_mapping(&layer.user_preferences, ContentKind::Plain)
    }

    fn build_ephemeral_layer(&self, payload: &AgentPayload) -> EphemeralLayer {
        let mut layer = EphemeralLayer::default();
        match payload {
            AgentPayload::Negotiation(p) => {
                if let Some(price) = p.current_price {
                    layer.budgets.push(format!("current_price: {price}"));
                }
                layer.vendor_data.push(format!("vendor: {}", p.vendor));
            }
            AgentPayload::Compliance(p) => {
                layer.api_responses.push(format!("clause_under_review: {}", p.clause));
            }
            AgentPayload::Forecast(p) => {
                layer.budgets.push(format!("planned_spend: {}", p.planned_spend));
                if let Some(current) = p.current_budget {
                    layer.budgets.push(format!("current_budget: {current}"));
                }
            }
        }
        layer.token_count = tokenizer::sum_sequence(&layer.quotes, ContentKind::Structured)
            + tokenizer::sum_sequence(&layer.budgets, ContentKind::Structured)
            + tokenizer::sum_sequence(&layer.vendor_data, ContentKind::Structured)
            + tokenizer::sum_sequence(&layer.api_responses, ContentKind::Structured);
        layer
    }

    /// Prune E -> S -> D in that order, each capped at a maximum fractional
    /// reduction of its pre-pruning size. Policy is never touched.
    fn prune(&self, ctx: &mut LayeredContext) -> PruningReport {
        let mut report = PruningReport::default();
        let total_budget = self.budget.total_budget;
        let mut overflow = ctx.total_tokens().saturating_sub(total_budget);
        if overflow == 0 {
            return report;
        }

        overflow = self.drain_ephemeral(ctx, overflow, &mut report);
        if overflow == 0 {
            return report;
        }
        overflow = self.drain_session(ctx, overflow, &mut report);
        if overflow == 0 {
            return report;
        }
        overflow = self.drain_domain(ctx, overflow, &mut report);

        report.overflow_tokens = overflow;
        report
    }

    fn drain_ephemeral(&self, ctx: &mut LayeredContext, mut overflow: u32, report: &mut PruningReport) -> u32 {
        let layer = &mut ctx.ephemeral;
        let cap = layer.token_count; // 100% max reduction
        let mut removed = 0u32;
        let vectors: &mut [&mut Vec<String>] = &mut [
            &mut layer.quotes,
            &mut layer.budgets,
            &mut layer.vendor_data,
            &mut layer.api_responses,
        ];
        'outer: for vec in vectors.iter_mut() {
            while !vec.is_empty() && overflow > 0 && removed < cap {
                let item = vec.remove(0);
                let tokens = tokenizer::estimate(&item, ContentKind::Structured);
                removed += tokens;
                overflow = overflow.saturating_sub(tokens);
                if overflow == 0 {
                    break 'outer;
                }
            }
        }
        if removed > 0 {
            layer.token_count = layer.token_count.saturating_sub(removed);
            report.steps.push(PruningStep { layer: "ephemeral", tokens_removed: removed });
        }
        overflow
    }

    fn drain_session(&self, ctx: &mut LayeredContext, mut overflow: u32, report: &mut PruningReport) -> u32 {
        let layer = &mut ctx.session;
        let original = layer.token_count;
        let cap = (original as f64 * 0.75).floor() as u32;
        let mut removed = 0u32;

        if layer.conversation_turns.len() > SESSION_TURNS_KEPT {
            let drop = layer.conversation_turns.len() - SESSION_TURNS_KEPT;
            let summarized: Vec<String> = layer.conversation_turns.drain(0..drop).collect();
            let freed = tokenizer::sum_sequence(&summarized, ContentKind::Plain);
            removed += freed;
        }
        if layer.tool_interactions.len() > SESSION_TOOL_CALLS_KEPT {
            let drop = layer.tool_interactions.len() - SESSION_TOOL_CALLS_KEPT;
            let summarized: Vec<String> = layer.tool_interactions.drain(0..drop).collect();
            let freed = tokenizer::sum_sequence(&summarized, ContentKind::Technical);
            removed += freed;
        }
        overflow = overflow.saturating_sub(removed);

        while overflow > 0 && removed < cap && !layer.session_findings.is_empty() {
            let item = layer.session_findings.remove(0);
            let tokens = tokenizer::estimate(&item, ContentKind::Plain);
            removed += tokens;
            overflow = overflow.saturating_sub(tokens);
        }

        if removed > 0 {
            layer.token_count = original.saturating_sub(removed);
            report.steps.push(PruningStep { layer: "session", tokens_removed: removed });
        }
        overflow
    }

    fn drain_domain(&self, ctx: &mut LayeredContext, mut overflow: u32, report: &mut PruningReport) -> u32 {
        let layer = &mut ctx.domain;
        let original = layer.token_count;
        let cap = (original as f64 * 0.60).floor() as u32;
        let mut removed = 0u32;

        while overflow > 0 && removed < cap && !layer.historical_patterns.is_empty() {
            let item = layer.historical_patterns.remove(0);
            let tokens = tokenizer::estimate(&item, ContentKind::Plain);
            removed += tokens;
            overflow = overflow.saturating_sub(tokens);
        }
        while overflow > 0 && removed < cap && !layer.market_intelligence.is_empty() {
            let item = layer.market_intelligence.remove(0);
            let tokens = tokenizer::estimate(&item, ContentKind::Plain);
            removed += tokens;
            overflow = overflow.saturating_sub(tokens);
        }

        if removed > 0 {
            layer.token_count = original.saturating_sub(removed);
            report.steps.push(PruningStep { layer: "domain", tokens_removed: removed });
        }
        overflow
    }

    /// Self-test helper: build a context with synthetic oversized session
    /// data to confirm Policy survives an extreme pruning pass untouched.
    pub fn simulate_extreme_pruning(
        &self,
        agent_kind: AgentKind,
        payload: &AgentPayload,
    ) -> (LayeredContext, PruningReport) {
        let bloated = SessionState {
            conversation_turns: (0..200).map(|i| format!("turn {i}: lorem ipsum dolor sit amet")).collect(),
            tool_interactions: (0..200).map(|i| format!("tool_call_{i}(args)")).collect(),
            session_findings: (0..200).map(|i| format!("finding {i} about vendor performance")).collect(),
            user_preferences: HashMap::new(),
        };
        self.build(agent_kind, payload, &bloated)
    }
}
