//! Compliance agent: assesses a contract clause against a flagged-terms
//! lexicon and risk tolerance, grounded on `gpc_manager.py`'s
//! `validate_contract_text` scoring and the agent constructor pattern in
//! `agents/cost_forecasting/agent.rs`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::domain::{AgentPayload, CompliancePayload, PolicyViolation, RiskTolerance, Severity};
use crate::policy::PolicyStore;

use super::model_client::ModelClient;
use super::{Agent, AgentArtifact, AgentCapabilities, AgentError, AgentMetrics};

/// Purely informational lexicon surfaced on the report; risk tiering and
/// legal-review routing are driven by the policy store's violation scan, not
/// by these hits.
static FLAGGED_TERMS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["exclusive", "perpetual", "irrevocable", "unlimited", "sole remedy", "liquidated damages"]);

pub struct ComplianceAgent {
    model: Arc<dyn ModelClient>,
    policy: Arc<PolicyStore>,
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl ComplianceAgent {
    pub fn new(model: Arc<dyn ModelClient>, policy: Arc<PolicyStore>) -> Self {
        Self { model, policy, invocations: AtomicU64::new(0), failures: AtomicU64::new(0) }
    }

    fn flagged_hits(clause: &str) -> Vec<&'static str> {
        let lower = clause.to_lowercase();
        FLAGGED_TERMS.iter().filter(|term| lower.contains(*term)).copied().collect()
    }

    /// Critical if any violation is Critical or >=2 High; High if one High or
    /// >=3 Medium; Medium if >=1 Medium; Low otherwise.
    fn risk_tier(violations: &[PolicyViolation]) -> &'static str {
        let count = |s: Severity| violations.iter().filter(|v| v.severity == s).count();
        if count(Severity::Critical) >= 1 || count(Severity::High) >= 2 {
            "critical"
        } else if count(Severity::High) >= 1 || count(Severity::Medium) >= 3 {
            "high"
        } else if count(Severity::Medium) >= 1 {
            "medium"
        } else {
            "low"
        }
    }

    fn tier_penalty(tier: &str) -> f64 {
        match tier {
            "medium" => 0.1,
            "high" => 0.2,
            "critical" => 0.3,
            _ => 0.0,
        }
    }

    /// Starts at 0.9, subtracts the risk tier's penalty and 0.1 per
    /// violation capped at 0.3, floored at 0.5.
    fn confidence(tier: &str, violation_count: usize) -> f64 {
        let per_violation = (0.1 * violation_count as f64).min(0.3);
        (0.9 - Self::tier_penalty(tier) - per_violation).max(0.5)
    }

    fn requires_legal_review(tier: &str, violations: &[PolicyViolation]) -> bool {
        matches!(tier, "high" | "critical") || violations.iter().any(|v| !v.auto_fixable)
    }
}

#[async_trait::async_trait]
impl Agent for ComplianceAgent {
    fn validate_payload(&self, payload: &AgentPayload) -> Result<(), AgentError> {
        match payload {
            AgentPayload::Compliance(_) => Ok(()),
            _ => Err(AgentError::InvalidPayload("expected a compliance payload".to_string())),
        }
    }

    async fn process(&self, payload: &AgentPayload, context_summary: &str) -> Result<AgentArtifact, AgentError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let AgentPayload::Compliance(p) = payload else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(AgentError::InvalidPayload("expected a compliance payload".to_string()));
        };

        let hits = Self::flagged_hits(&p.clause);
        let violations = self.policy.validate_text(&p.clause);
        let prompt = Self::build_prompt(p, &hits, context_summary);
        let draft = self
            .model
            .complete("You are a contract compliance reviewer.", &prompt)
            .await
            .map_err(|e| {
                self.failures.fetch_add(1, Ordering::Relaxed);
                AgentError::ModelClient(e)
            })?;

        let tier = Self::risk_tier(&violations);
        let confidence = Self::confidence(tier, violations.len());
        let legal_review = Self::requires_legal_review(tier, &violations);

        let mut report = draft;
        report.push_str(&format!("\n\nRisk Tier: {tier}"));
        if !hits.is_empty() {
            report.push_str(&format!("\nFlagged Terms: {}", hits.join(", ")));
        }
        if legal_review {
            report.push_str("\nLegal Review Required: yes");
        }
        Ok(AgentArtifact { text: report, confidence })
    }

    fn report_capabilities(&self) -> AgentCapabilities {
        AgentCapabilities {
            agent_id: "compliance".to_string(),
            version: "1.0.0",
            description: "Assesses contract clauses against flagged terms and risk tolerance.",
        }
    }

    fn report_metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_invocations: self.invocations.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl ComplianceAgent {
    fn build_prompt(payload: &CompliancePayload, hits: &[&'static str], context_summary: &str) -> String {
        format!(
            "Review this clause for compliance risk:\n{}\n\nFlagged terms found: {:?}\nContext:\n{}",
            payload.clause, hits, context_summary,
        )
    }
}
