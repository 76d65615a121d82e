//! Negotiation agent: drafts vendor negotiation positions and layers in
//! discount-tiered warranty and risk language before the critic ever sees
//! the text, grounded on `agents/cost_forecasting/agent.rs`'s
//! constructor/`with_defaults`/internal-execute shape.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AgentPayload, NegotiationPayload};

use super::model_client::ModelClient;
use super::{Agent, AgentArtifact, AgentCapabilities, AgentError, AgentMetrics};

const STANDARD_WARRANTIES: [&str; 3] = [
    "Extended Warranty Period: coverage extended to 24 months from delivery.",
    "Performance SLA: vendor guarantees performance against agreed specifications with defined remedies.",
    "Quality Assurance: deliverables are subject to vendor-funded quality audits through the contract term.",
];

const AGGRESSIVE_WARRANTIES: [&str; 3] = [
    "Financial Guarantee: vendor posts a performance bond covering the discounted contract value.",
    "Delivery Penalty: late delivery triggers a liquidated-damages penalty per the agreed schedule.",
    "IP Indemnification: vendor indemnifies the buyer against third-party intellectual-property claims.",
];

pub struct NegotiationAgent {
    model: Arc<dyn ModelClient>,
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl NegotiationAgent {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model, invocations: AtomicU64::new(0), failures: AtomicU64::new(0) }
    }

    fn prompt(payload: &NegotiationPayload, discount: f64, context_summary: &str) -> String {
        format!(
            "Draft a negotiation position for vendor '{}' in category '{}', targeting a {:.1}% discount.\n\
             Context:\n{}",
            payload.vendor,
            payload.category,
            discount * 100.0,
            context_summary,
        )
    }

    /// Three standard warranties at >=15% discount; three additional
    /// aggressive-discount warranties at >=25%; category warranties merged in
    /// by prefix match whenever the standard set applies.
    fn enrich(mut draft: String, payload: &NegotiationPayload, discount: f64) -> String {
        if discount >= 0.15 {
            draft.push_str("\n\nStandard Warranties:");
            for warranty in STANDARD_WARRANTIES {
                draft.push_str(&format!("\n- {warranty}"));
            }

            let category_warranties = Self::category_warranties(&payload.category);
            if !category_warranties.is_empty() {
                draft.push_str("\n\nCategory Warranties:");
                for warranty in category_warranties {
                    draft.push_str(&format!("\n- {warranty}"));
                }
            }
        }

        if discount >= 0.25 {
            draft.push_str("\n\nAggressive-Discount Warranties:");
            for warranty in AGGRESSIVE_WARRANTIES {
                draft.push_str(&format!("\n- {warranty}"));
            }
        }

        draft.push_str(&format!(
            "\n\nContract Terms: duration and volume commitments to be confirmed in final draft, reflecting the \
             {:.1}% discount sought.",
            discount * 100.0
        ));
        draft.push_str(&format!(
            "\n\nRisk Mitigation: maintain a secondary vendor option for this category while the {:.1}% discount \
             is under negotiation.",
            discount * 100.0
        ));
        draft
    }

    fn category_warranties(category: &str) -> &'static [&'static str] {
        let lower = category.to_lowercase();
        if lower.starts_with("software") {
            &["Software Warranty: vendor warrants the software is free of material defects for 12 months."]
        } else if lower.starts_with("hardware") {
            &["Hardware Warranty: vendor warrants parts and labor for repair or replacement for the contract term."]
        } else if lower.starts_with("service") {
            &["Service Warranty: vendor warrants remediation of any reported service defect within 48 hours."]
        } else {
            &[]
        }
    }

    /// Confidence drops as the requested discount gets more aggressive,
    /// reflecting the greater uncertainty of a vendor accepting it. Distinct
    /// penalty system from the Compliance agent's term-count based formula.
    fn confidence(discount: f64) -> f64 {
        let penalty = if discount >= 0.25 {
            0.2
        } else if discount >= 0.15 {
            0.1
        } else {
            0.0
        };
        (0.9 - penalty).max(0.3)
    }
}

#[async_trait]
impl Agent for NegotiationAgent {
    fn validate_payload(&self, payload: &AgentPayload) -> Result<(), AgentError> {
        match payload {
            AgentPayload::Negotiation(p) => p
                .normalize_discount()
                .map(|_| ())
                .map_err(|e| AgentError::InvalidPayload(e.to_string())),
            _ => Err(AgentError::InvalidPayload("expected a negotiation payload".to_string())),
        }
    }

    async fn process(&self, payload: &AgentPayload, context_summary: &str) -> Result<AgentArtifact, AgentError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let AgentPayload::Negotiation(p) = payload else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(AgentError::InvalidPayload("expected a negotiation payload".to_string()));
        };
        let discount = p.normalize_discount().map_err(|e| {
            self.failures.fetch_add(1, Ordering::Relaxed);
            AgentError::InvalidPayload(e.to_string())
        })?;

        let prompt = Self::prompt(p, discount, context_summary);
        let draft = self
            .model
            .complete("You are a procurement negotiation specialist.", &prompt)
            .await
            .map_err(|e| {
                self.failures.fetch_add(1, Ordering::Relaxed);
                AgentError::ModelClient(e)
            })?;

        Ok(AgentArtifact { text: Self::enrich(draft, p, discount), confidence: Self::confidence(discount) })
    }

    fn report_capabilities(&self) -> AgentCapabilities {
        AgentCapabilities {
            agent_id: "negotiation".to_string(),
            version: "1.0.0",
            description: "Drafts vendor negotiation positions with discount-tiered warranty and risk terms.",
        }
    }

    fn report_metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_invocations: self.invocations.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
