//! Forecast agent: projects category spend against the current budget and
//! scores alignment with enterprise OKRs, grounded on
//! `agents/cost_forecasting/agent.rs`'s variance/confidence calculations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;

use crate::domain::{AgentPayload, ForecastPayload};
use crate::policy::PolicyStore;

use super::model_client::ModelClient;
use super::{Agent, AgentArtifact, AgentCapabilities, AgentError, AgentMetrics};

pub struct ForecastAgent {
    model: Arc<dyn ModelClient>,
    policy: Arc<PolicyStore>,
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl ForecastAgent {
    pub fn new(model: Arc<dyn ModelClient>, policy: Arc<PolicyStore>) -> Self {
        Self { model, policy, invocations: AtomicU64::new(0), failures: AtomicU64::new(0) }
    }

    /// Percent delta of planned spend against a baseline: the caller-supplied
    /// current budget when present, otherwise the category's enterprise
    /// budget threshold. `None` when neither baseline is available.
    fn variance_pct(&self, payload: &ForecastPayload) -> Option<f64> {
        let baseline = match payload.current_budget {
            Some(budget) if !budget.is_zero() => budget.to_f64()?,
            _ => {
                let snapshot = self.policy.snapshot();
                let threshold = snapshot.budget_thresholds.get(&payload.category)?;
                if threshold.is_zero() {
                    return None;
                }
                threshold.to_f64()?
            }
        };
        let planned = payload.planned_spend.to_f64()?;
        Some((planned - baseline) / baseline * 100.0)
    }

    /// Ratio of planned spend to the enterprise-configured budget threshold
    /// for this category, used for the confidence falloff and the OKR
    /// overage penalty (independent of whatever current budget the caller
    /// supplied for the variance tier itself).
    fn threshold_ratio(&self, payload: &ForecastPayload) -> Option<f64> {
        let snapshot = self.policy.snapshot();
        let threshold = snapshot.budget_thresholds.get(&payload.category)?.to_f64()?;
        if threshold <= 0.0 {
            return None;
        }
        Some(payload.planned_spend.to_f64()? / threshold)
    }

    /// CriticalOverage/UnderBudget at |Δ%|>=25%, Significant/UnderBudget at
    /// >=15%, MinorOverage at >=5% when positive (negative stays OnTarget at
    /// this band), else OnTarget.
    fn tier_from_delta(delta_pct: f64) -> VarianceTier {
        let magnitude = delta_pct.abs();
        if magnitude >= 25.0 {
            if delta_pct > 0.0 { VarianceTier::CriticalOverage } else { VarianceTier::UnderBudget }
        } else if magnitude >= 15.0 {
            if delta_pct > 0.0 { VarianceTier::SignificantOverage } else { VarianceTier::UnderBudget }
        } else if magnitude >= 5.0 && delta_pct > 0.0 {
            VarianceTier::MinorOverage
        } else {
            VarianceTier::OnTarget
        }
    }

    /// Board at >=$500k, else executive at >=$100k; independently, CFO for a
    /// critical-overage tier or finance director for a significant one.
    /// Falls back to the standard process when nothing else routes it.
    fn approval_requirements(tier: Option<VarianceTier>, planned_spend: f64) -> Vec<&'static str> {
        let mut requirements = Vec::new();
        if planned_spend >= 500_000.0 {
            requirements.push("Board approval required");
        } else if planned_spend >= 100_000.0 {
            requirements.push("Executive approval required");
        }
        match tier {
            Some(VarianceTier::CriticalOverage) => requirements.push("CFO approval required"),
            Some(VarianceTier::SignificantOverage) => requirements.push("Finance director approval required"),
            _ => {}
        }
        if requirements.is_empty() {
            requirements.push("Standard approval process applies");
        }
        requirements
    }

    /// Set iff planned spend is at least $100k or the variance tier is
    /// Significant or Critical overage.
    fn requires_executive_approval(tier: Option<VarianceTier>, planned_spend: f64) -> bool {
        planned_spend >= 100_000.0
            || matches!(tier, Some(VarianceTier::SignificantOverage) | Some(VarianceTier::CriticalOverage))
    }

    /// One alignment entry per enterprise OKR line in `context_summary`,
    /// scored by keyword overlap against the request's justification,
    /// strategic priority, and category, then penalized when the spend
    /// ratio against threshold is deep in overage.
    fn okr_alignment(payload: &ForecastPayload, context_summary: &str, ratio: Option<f64>) -> Vec<OkrAlignment> {
        let okrs: Vec<&str> = context_summary.lines().filter(|l| l.contains("OKR")).collect();
        let focus = format!(
            "{} {} {}",
            payload.justification.as_deref().unwrap_or(""),
            payload.strategic_priority.as_deref().unwrap_or(""),
            payload.category,
        )
        .to_lowercase();

        okrs.iter()
            .map(|okr| {
                let okr_lower = okr.to_lowercase();
                let keywords: Vec<&str> = okr_lower.split_whitespace().filter(|w| w.len() > 4).collect();
                if keywords.is_empty() {
                    return OkrAlignment { okr: (*okr).to_string(), status: OkrStatus::Unknown, score: 0.0 };
                }
                let hits = keywords.iter().filter(|w| focus.contains(*w)).count();
                let mut score = hits as f64 / keywords.len() as f64;
                if ratio.is_some_and(|r| r > 1.5) {
                    score = (score - 0.2).max(0.0);
                }
                let status = if score >= 0.5 {
                    OkrStatus::Aligned
                } else if score > 0.0 {
                    OkrStatus::PartiallyAligned
                } else {
                    OkrStatus::Misaligned
                };
                OkrAlignment { okr: (*okr).to_string(), status, score }
            })
            .collect()
    }

    /// Confidence falls off as the threshold ratio moves further from 1.0;
    /// distinct from the other two agents' penalty systems.
    fn confidence(ratio: Option<f64>) -> f64 {
        match ratio {
            None => 0.5,
            Some(r) => (1.0 - 0.3 * (r - 1.0).abs()).clamp(0.2, 1.0),
        }
    }
}

/// Budget-variance bucket, driven by |Δ%| against the spend baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarianceTier {
    OnTarget,
    MinorOverage,
    SignificantOverage,
    CriticalOverage,
    UnderBudget,
}

impl std::fmt::Display for VarianceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::OnTarget => "OnTarget",
            Self::MinorOverage => "MinorOverage",
            Self::SignificantOverage => "SignificantOverage",
            Self::CriticalOverage => "CriticalOverage",
            Self::UnderBudget => "UnderBudget",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkrStatus {
    Aligned,
    PartiallyAligned,
    Misaligned,
    Unknown,
}

impl std::fmt::Display for OkrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Aligned => "Aligned",
            Self::PartiallyAligned => "PartiallyAligned",
            Self::Misaligned => "Misaligned",
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct OkrAlignment {
    pub okr: String,
    pub status: OkrStatus,
    pub score: f64,
}

#[async_trait::async_trait]
impl Agent for ForecastAgent {
    fn validate_payload(&self, payload: &AgentPayload) -> Result<(), AgentError> {
        match payload {
            AgentPayload::Forecast(_) => Ok(()),
            _ => Err(AgentError::InvalidPayload("expected a forecast payload".to_string())),
        }
    }

    async fn process(&self, payload: &AgentPayload, context_summary: &str) -> Result<AgentArtifact, AgentError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let AgentPayload::Forecast(p) = payload else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(AgentError::InvalidPayload("expected a forecast payload".to_string()));
        };

        let prompt = format!(
            "Forecast spend for category '{}' in {} with planned spend {}.\nContext:\n{}",
            p.category, p.quarter, p.planned_spend, context_summary,
        );
        let draft = self
            .model
            .complete("You are a budget forecasting specialist.", &prompt)
            .await
            .map_err(|e| {
                self.failures.fetch_add(1, Ordering::Relaxed);
                AgentError::ModelClient(e)
            })?;

        let planned_spend = p.planned_spend.to_f64().unwrap_or(0.0);
        let delta_pct = self.variance_pct(p);
        let tier = delta_pct.map(Self::tier_from_delta);
        let ratio = self.threshold_ratio(p);
        let approvals = Self::approval_requirements(tier, planned_spend);
        let executive_approval = Self::requires_executive_approval(tier, planned_spend);
        let alignment = Self::okr_alignment(p, context_summary, ratio);
        let confidence = Self::confidence(ratio);

        let mut report = draft;
        match tier {
            Some(tier) => report.push_str(&format!("\n\nVariance Tier: {tier}")),
            None => report.push_str("\n\nVariance Tier: Unknown"),
        }
        if let Some(delta) = delta_pct {
            report.push_str(&format!("\nBudget Variance: {delta:.1}%"));
        }
        if alignment.is_empty() {
            report.push_str("\nOKR Alignment: no enterprise OKRs in context");
        } else {
            report.push_str("\nOKR Alignment:");
            for entry in &alignment {
                report.push_str(&format!("\n- {}: {} ({:.2})", entry.okr, entry.status, entry.score));
            }
        }
        report.push_str(&format!("\nApproval Requirements: {}", approvals.join(", ")));
        if executive_approval {
            report.push_str("\nExecutive Approval Required: yes");
        }
        Ok(AgentArtifact { text: report, confidence })
    }

    fn report_capabilities(&self) -> AgentCapabilities {
        AgentCapabilities {
            agent_id: "forecast".to_string(),
            version: "1.0.0",
            description: "Projects category spend against budget and scores OKR alignment.",
        }
    }

    fn report_metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_invocations: self.invocations.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::model_client::MockModelClient;
    use rust_decimal_macros::dec;

    fn payload(planned: rust_decimal::Decimal, budget: Option<rust_decimal::Decimal>) -> AgentPayload {
        let year = chrono::Utc::now().format("%Y").to_string();
        AgentPayload::Forecast(ForecastPayload {
            category: "software".into(),
            quarter: format!("Q1 {year}"),
            planned_spend: planned,
            current_budget: budget,
            justification: None,
            strategic_priority: None,
        })
    }

    fn agent() -> ForecastAgent {
        ForecastAgent::new(Arc::new(MockModelClient), Arc::new(PolicyStore::from_defaults()))
    }

    #[tokio::test]
    async fn on_threshold_is_on_target() {
        let agent = agent();
        let out = agent.process(&payload(dec!(48000), None), "ctx").await.unwrap();
        assert!(out.text.contains("Variance Tier: OnTarget"));
        assert!(!out.text.contains("Executive Approval Required"));
        assert!(out.text.contains("Standard approval process applies"));
    }

    #[tokio::test]
    async fn minor_overage_at_10_percent_over_threshold() {
        let agent = agent();
        let out = agent.process(&payload(dec!(55000), None), "ctx").await.unwrap();
        assert!(out.text.contains("Variance Tier: MinorOverage"));
    }

    #[tokio::test]
    async fn under_budget_at_30_percent_below_threshold() {
        let agent = agent();
        let out = agent.process(&payload(dec!(35000), None), "ctx").await.unwrap();
        assert!(out.text.contains("Variance Tier: UnderBudget"));
    }

    #[tokio::test]
    async fn large_overrun_is_critical_and_needs_cfo_approval() {
        let agent = agent();
        let out = agent.process(&payload(dec!(200000), None), "ctx").await.unwrap();
        assert!(out.text.contains("Variance Tier: CriticalOverage"));
        assert!(out.text.contains("CFO approval required"));
        assert!(out.text.contains("Executive approval required"));
        assert!(out.text.contains("Executive Approval Required: yes"));
    }

    #[tokio::test]
    async fn half_million_spend_routes_to_board() {
        let agent = agent();
        let out = agent.process(&payload(dec!(600000), None), "ctx").await.unwrap();
        assert!(out.text.contains("Board approval required"));
        assert!(!out.text.contains("Executive approval required"));
    }

    #[tokio::test]
    async fn unknown_category_threshold_is_unknown_tier() {
        let agent = agent();
        let mut payload = payload(dec!(200000), None);
        if let AgentPayload::Forecast(p) = &mut payload {
            p.category = "unmapped_category".into();
        }
        let out = agent.process(&payload, "ctx").await.unwrap();
        assert!(out.text.contains("Variance Tier: Unknown"));
        assert!(out.text.contains("Executive approval required"));
    }

    #[tokio::test]
    async fn okr_alignment_lists_per_okr_status() {
        let agent = agent();
        let mut payload = payload(dec!(48000), None);
        if let AgentPayload::Forecast(p) = &mut payload {
            p.justification = Some("Consolidate vendor count in redundant categories".to_string());
        }
        let context = "Policy OKR: Consolidate vendor count in redundant categories";
        let out = agent.process(&payload, context).await.unwrap();
        assert!(out.text.contains("OKR Alignment:"));
        assert!(out.text.contains("Aligned"));
    }
}
