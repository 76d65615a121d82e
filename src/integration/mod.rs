//! Integration Manager: rolling compliance metrics across workflow runs,
//! grounded on `integration_manager.py`'s running-average update and
//! bounded-history pattern, using the teacher's `Mutex`-guarded counters
//! idiom for shared mutable state.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AgentKind, FinalStatus, RevisionAction, WorkflowResult};

const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentCounters {
    pub total_requests: u64,
    pub compliant: u64,
    pub revised: u64,
    pub flagged: u64,
    pub non_compliant: u64,
    pub errors: u64,
    pub average_compliance_score: f64,
    pub average_processing_ms: f64,
    pub cumulative_tokens: u64,
}

impl AgentCounters {
    fn record(&mut self, result: &WorkflowResult) {
        self.total_requests += 1;
        match result.final_status {
            FinalStatus::Compliant => self.compliant += 1,
            FinalStatus::Revised => self.revised += 1,
            FinalStatus::Flagged => self.flagged += 1,
            FinalStatus::NonCompliant => self.non_compliant += 1,
            FinalStatus::Error => self.errors += 1,
        }
        self.cumulative_tokens += u64::from(result.metrics.context_usage.total_tokens);

        let k = self.total_requests as f64;
        self.average_processing_ms = running_average(self.average_processing_ms, k, result.metrics.total_ms as f64);
        if let Some(critic) = &result.critic {
            self.average_compliance_score =
                running_average(self.average_compliance_score, k, critic.compliance_score);
        }
    }
}

/// `avg' = ((avg * (k - 1)) + x) / k`
fn running_average(avg: f64, k: f64, x: f64) -> f64 {
    if k <= 1.0 {
        x
    } else {
        ((avg * (k - 1.0)) + x) / k
    }
}

/// A compact record kept in the rolling history buffer, distinct from the
/// full `WorkflowResult` to keep `recent()` responses small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub request_id: uuid::Uuid,
    pub agent_kind: AgentKind,
    pub final_status: FinalStatus,
    pub compliance_score: Option<f64>,
    pub violation_count: u64,
    pub auto_revised: bool,
    pub total_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&WorkflowResult> for HistoryEntry {
    fn from(result: &WorkflowResult) -> Self {
        Self {
            request_id: result.request_id,
            agent_kind: result.agent_kind,
            final_status: result.final_status,
            compliance_score: result.critic.as_ref().map(|c| c.compliance_score),
            violation_count: result.critic.as_ref().map_or(0, |c| c.violations.len() as u64),
            auto_revised: result.critic.as_ref().is_some_and(|c| c.action_taken == RevisionAction::AutoRevised),
            total_ms: result.metrics.total_ms,
            timestamp: result.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub window_hours: i64,
    pub total_requests: u64,
    pub compliant: u64,
    pub revised: u64,
    pub flagged: u64,
    pub non_compliant: u64,
    pub errors: u64,
    pub average_compliance_score: f64,
    pub compliant_pct: f64,
    pub windowed_violations: u64,
    pub windowed_auto_revisions: u64,
    pub revision_success_rate: f64,
}

struct IntegrationState {
    per_agent: HashMap<AgentKind, AgentCounters>,
    history: VecDeque<HistoryEntry>,
}

impl IntegrationState {
    fn new() -> Self {
        Self { per_agent: HashMap::new(), history: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }
}

/// Tracks rolling compliance metrics across every workflow run. All state
/// lives behind a single `Mutex`; updates are O(1) and held only for the
/// duration of the record, never across an await point.
pub struct IntegrationManager {
    state: Mutex<IntegrationState>,
}

impl Default for IntegrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrationManager {
    pub fn new() -> Self {
        Self { state: Mutex::new(IntegrationState::new()) }
    }

    pub fn record(&self, result: &WorkflowResult) {
        let mut state = self.state.lock().expect("integration manager lock poisoned");
        state.per_agent.entry(result.agent_kind).or_default().record(result);

        if state.history.len() == HISTORY_CAPACITY {
            state.history.pop_front();
        }
        state.history.push_back(HistoryEntry::from(result));
    }

    pub fn agent_counters(&self, kind: AgentKind) -> AgentCounters {
        let state = self.state.lock().expect("integration manager lock poisoned");
        state.per_agent.get(&kind).copied().unwrap_or_default()
    }

    pub fn all_counters(&self) -> HashMap<AgentKind, AgentCounters> {
        let state = self.state.lock().expect("integration manager lock poisoned");
        state.per_agent.clone()
    }

    /// Most recent `limit` history entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let state = self.state.lock().expect("integration manager lock poisoned");
        state.history.iter().rev().take(limit).cloned().collect()
    }

    /// Aggregate compliance report over the last `hours` of history.
    pub fn compliance_report(&self, hours: i64) -> ComplianceReport {
        let state = self.state.lock().expect("integration manager lock poisoned");
        let cutoff = Utc::now() - Duration::hours(hours);
        let windowed: Vec<&HistoryEntry> = state.history.iter().filter(|e| e.timestamp >= cutoff).collect();

        let mut report = ComplianceReport {
            window_hours: hours,
            total_requests: 0,
            compliant: 0,
            revised: 0,
            flagged: 0,
            non_compliant: 0,
            errors: 0,
            average_compliance_score: 0.0,
            compliant_pct: 0.0,
            windowed_violations: 0,
            windowed_auto_revisions: 0,
            revision_success_rate: 0.0,
        };
        let mut score_sum = 0.0;
        let mut score_count = 0u64;
        for entry in windowed {
            report.total_requests += 1;
            match entry.final_status {
                FinalStatus::Compliant => report.compliant += 1,
                FinalStatus::Revised => report.revised += 1,
                FinalStatus::Flagged => report.flagged += 1,
                FinalStatus::NonCompliant => report.non_compliant += 1,
                FinalStatus::Error => report.errors += 1,
            }
            if let Some(score) = entry.compliance_score {
                score_sum += score;
                score_count += 1;
            }
            report.windowed_violations += entry.violation_count;
            if entry.auto_revised {
                report.windowed_auto_revisions += 1;
            }
        }
        if score_count > 0 {
            report.average_compliance_score = score_sum / score_count as f64;
        }
        if report.total_requests > 0 {
            report.compliant_pct = report.compliant as f64 / report.total_requests as f64 * 100.0;
        }
        report.revision_success_rate =
            report.windowed_auto_revisions as f64 / report.windowed_violations.max(1) as f64;
        report
    }

    pub fn reset(&self) {
        let mut state = self.state.lock().expect("integration manager lock poisoned");
        *state = IntegrationState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AgentPayload, ContextUsage, CriticOutcome, Location, NegotiationPayload, PolicyViolation, Severity,
        ViolationKind, WorkflowMetrics,
    };

    fn sample_result(status: FinalStatus, score: f64) -> WorkflowResult {
        sample_result_with_violations(status, score, RevisionAction::Approved, 0)
    }

    fn sample_result_with_violations(
        status: FinalStatus,
        score: f64,
        action: RevisionAction,
        violation_count: usize,
    ) -> WorkflowResult {
        let violations = (0..violation_count)
            .map(|_| PolicyViolation {
                kind: ViolationKind::MissingWarranty,
                severity: Severity::Medium,
                description: "missing warranty".into(),
                location: Location::Layer { name: "output".into() },
                suggested_fix: None,
                auto_fixable: true,
                policy_reference: None,
            })
            .collect();
        WorkflowResult {
            request_id: uuid::Uuid::new_v4(),
            agent_kind: AgentKind::Negotiation,
            payload: AgentPayload::Negotiation(NegotiationPayload {
                vendor: "Acme".into(),
                target_discount: 0.1,
                category: "software".into(),
                current_price: None,
                contract_duration: None,
                volume_commitment: None,
                extra: None,
            }),
            raw_artifact: "draft".into(),
            agent_confidence: 0.8,
            critic: Some(CriticOutcome {
                original_text: "draft".into(),
                revised_text: None,
                violations,
                action_taken: action,
                compliance_score: score,
                notes: vec![],
                processing_time_ms: 1,
            }),
            final_text: "draft".into(),
            final_status: status,
            metrics: WorkflowMetrics { context_usage: ContextUsage::default(), total_ms: 10, ..Default::default() },
            timestamp: Utc::now(),
            success: true,
            error_message: None,
        }
    }

    #[test]
    fn running_average_matches_formula() {
        assert_eq!(running_average(0.0, 1.0, 10.0), 10.0);
        assert_eq!(running_average(10.0, 2.0, 20.0), 15.0);
    }

    #[test]
    fn record_updates_per_agent_counters() {
        let manager = IntegrationManager::new();
        manager.record(&sample_result(FinalStatus::Compliant, 1.0));
        manager.record(&sample_result(FinalStatus::Revised, 0.8));
        let counters = manager.agent_counters(AgentKind::Negotiation);
        assert_eq!(counters.total_requests, 2);
        assert_eq!(counters.compliant, 1);
        assert_eq!(counters.revised, 1);
        assert!((counters.average_compliance_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn history_is_bounded_at_capacity() {
        let manager = IntegrationManager::new();
        for _ in 0..(HISTORY_CAPACITY + 10) {
            manager.record(&sample_result(FinalStatus::Compliant, 1.0));
        }
        assert_eq!(manager.recent(HISTORY_CAPACITY + 10).len(), HISTORY_CAPACITY);
    }

    #[test]
    fn compliance_report_computes_compliant_pct() {
        let manager = IntegrationManager::new();
        for _ in 0..5 {
            manager.record(&sample_result(FinalStatus::Compliant, 1.0));
        }
        for _ in 0..3 {
            manager.record(&sample_result(FinalStatus::Revised, 0.8));
        }
        for _ in 0..2 {
            manager.record(&sample_result(FinalStatus::Flagged, 0.5));
        }
        let report = manager.compliance_report(1);
        assert_eq!(report.total_requests, 10);
        assert_eq!(report.compliant, 5);
        assert_eq!(report.revised, 3);
        assert_eq!(report.flagged, 2);
        assert!((report.compliant_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn revision_success_rate_divides_auto_revisions_by_violations() {
        let manager = IntegrationManager::new();
        manager.record(&sample_result_with_violations(FinalStatus::Revised, 0.8, RevisionAction::AutoRevised, 2));
        manager.record(&sample_result_with_violations(
            FinalStatus::Flagged,
            0.5,
            RevisionAction::ManualReviewRequired,
            3,
        ));
        let report = manager.compliance_report(1);
        assert_eq!(report.windowed_violations, 5);
        assert_eq!(report.windowed_auto_revisions, 1);
        assert!((report.revision_success_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn revision_success_rate_is_zero_with_no_violations() {
        let manager = IntegrationManager::new();
        manager.record(&sample_result(FinalStatus::Compliant, 1.0));
        let report = manager.compliance_report(1);
        assert_eq!(report.windowed_violations, 0);
        assert_eq!(report.revision_success_rate, 0.0);
    }

    #[test]
    fn reset_clears_all_state() {
        let manager = IntegrationManager::new();
        manager.record(&sample_result(FinalStatus::Compliant, 1.0));
        manager.reset();
        assert_eq!(manager.agent_counters(AgentKind::Negotiation).total_requests, 0);
        assert!(manager.recent(10).is_empty());
    }
}
