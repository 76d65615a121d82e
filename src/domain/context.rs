//! Layered context data model: Policy (pinned), Domain, Session, Ephemeral.
//!
//! This module only holds the *shapes*; building and pruning them lives in
//! the `context` module so the assembler's algorithm stays separate from the
//! data it operates on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Share of the total budget each layer is entitled to, and the maximum
/// fraction of a layer's current tokens that a single pruning pass may
/// remove.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub total_budget: u32,
    pub policy_share: f64,
    pub domain_share: f64,
    pub session_share: f64,
    pub ephemeral_share: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_budget: 2000,
            policy_share: 0.25,
            domain_share: 0.25,
            session_share: 0.40,
            ephemeral_share: 0.10,
        }
    }
}

impl BudgetConfig {
    /// Shares must sum to 1.0 within a small tolerance.
    pub fn shares_valid(&self) -> bool {
        let sum = self.policy_share + self.domain_share + self.session_share + self.ephemeral_share;
        (sum - 1.0).abs() <= 0.001
    }

    pub fn policy_budget(&self) -> u32 {
        (self.total_budget as f64 * self.policy_share).floor() as u32
    }

    pub fn domain_budget(&self) -> u32 {
        (self.total_budget as f64 * self.domain_share).floor() as u32
    }

    pub fn session_budget(&self) -> u32 {
        (self.total_budget as f64 * self.session_share).floor() as u32
    }

    pub fn ephemeral_budget(&self) -> u32 {
        (self.total_budget as f64 * self.ephemeral_share).floor() as u32
    }
}

/// Pinned layer: enterprise policy. Never pruned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyLayer {
    pub enterprise_okrs: Vec<String>,
    pub prohibited_clauses: Vec<String>,
    pub required_clauses: Vec<String>,
    pub budget_thresholds: HashMap<String, Decimal>,
    pub compliance_guardrails: Vec<String>,
    pub legal_requirements: Vec<String>,
    pub token_count: u32,
}

/// Category/vendor strategy context. Summarized under pressure, at most 60%
/// reduction in a single pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainLayer {
    pub category_playbooks: Vec<String>,
    pub vendor_guidelines: Vec<String>,
    pub market_intelligence: Vec<String>,
    pub historical_patterns: Vec<String>,
    pub token_count: u32,
}

/// Conversational/session context. Rolling summaries with recency bias, at
/// most 75% reduction in a single pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLayer {
    pub conversation_turns: Vec<String>,
    pub tool_interactions: Vec<String>,
    pub session_findings: Vec<String>,
    pub user_preferences: HashMap<String, String>,
    pub token_count: u32,
}

/// Short-lived tool/API payloads. Fully discarded first under pressure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EphemeralLayer {
    pub quotes: Vec<String>,
    pub budgets: Vec<String>,
    pub vendor_data: Vec<String>,
    pub api_responses: Vec<String>,
    pub token_count: u32,
}

/// The four-layer assembled context for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayeredContext {
    pub policy: PolicyLayer,
    pub domain: DomainLayer,
    pub session: SessionLayer,
    pub ephemeral: EphemeralLayer,
}

impl LayeredContext {
    pub fn total_tokens(&self) -> u32 {
        self.policy.token_count
            + self.domain.token_count
            + self.session.token_count
            + self.ephemeral.token_count
    }

    /// View passed to the critic: Policy and Domain only, never Session or
    /// Ephemeral. This is the isolation invariant from spec.md §4.5/§4.7.
    pub fn critic_view(&self) -> CriticView<'_> {
        CriticView {
            policy: &self.policy,
            domain: &self.domain,
        }
    }
}

/// Read-only view of the layers the critic is allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct CriticView<'a> {
    pub policy: &'a PolicyLayer,
    pub domain: &'a DomainLayer,
}

/// A single step of the pruning trace, recording what was released and from
/// where, in the order it happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruningStep {
    pub layer: &'static str,
    pub tokens_removed: u32,
}

/// Result of reconciling a built context against its budget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruningReport {
    pub steps: Vec<PruningStep>,
    pub overflow_tokens: u32,
}

impl PruningReport {
    pub fn had_overflow(&self) -> bool {
        self.overflow_tokens > 0
    }
}
