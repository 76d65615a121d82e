//! Global Policy Critic: an independent second pass over an agent's output
//! that sees only the Policy and Domain layers, grounded on
//! `gp_critic.py`'s `validate_output`/`_determine_action`/`auto_revise`.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;

use crate::domain::context::CriticView;
use crate::domain::{CriticOutcome, Location, PolicyViolation, RevisionAction, Severity, ViolationKind};
use crate::policy::PolicyStore;

pub struct GlobalPolicyCritic {
    policy: Arc<PolicyStore>,
}

impl GlobalPolicyCritic {
    pub fn new(policy: Arc<PolicyStore>) -> Self {
        Self { policy }
    }

    /// Run the full critique. `budget_context` carries (category, amount) for
    /// agents whose output should be checked against spend thresholds.
    pub fn review(
        &self,
        text: &str,
        _critic_view: CriticView<'_>,
        budget_context: Option<(&str, Decimal)>,
    ) -> CriticOutcome {
        let started = Instant::now();
        let violations = self.policy.validate_comprehensive(text, budget_context);
        let action = Self::determine_action(&violations);

        let revised_text = if action == RevisionAction::AutoRevised {
            Some(Self::auto_revise(text, &violations))
        } else {
            None
        };

        let compliance_score = Self::compliance_score(&violations);
        let notes = violations.iter().map(|v| v.description.clone()).collect();

        CriticOutcome {
            original_text: text.to_string(),
            revised_text,
            violations,
            action_taken: action,
            compliance_score,
            notes,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Approved when clean; AutoRevised when every violation found is
    /// auto-fixable; Rejected when a critical, non-fixable violation
    /// survives; ManualReviewRequired for any other non-fixable violation.
    fn determine_action(violations: &[PolicyViolation]) -> RevisionAction {
        if violations.is_empty() {
            return RevisionAction::Approved;
        }
        let any_non_fixable = violations.iter().any(|v| !v.auto_fixable);
        let any_critical = violations.iter().any(|v| v.severity == Severity::Critical);
        if any_critical && any_non_fixable {
            return RevisionAction::Rejected;
        }
        if any_non_fixable {
            return RevisionAction::ManualReviewRequired;
        }
        RevisionAction::AutoRevised
    }

    /// Deterministic text transforms per violation kind. Only invoked when
    /// every detected violation is auto-fixable. `ProhibitedClause` and
    /// `UnauthorizedDiscount` hits carry precise byte offsets and get spliced
    /// out in place, applied in descending start order so an earlier edit
    /// never invalidates a later one's offsets. The other kinds have no
    /// in-text span to splice and get their standard language appended.
    fn auto_revise(text: &str, violations: &[PolicyViolation]) -> String {
        let mut spliceable: Vec<&PolicyViolation> = violations
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::ProhibitedClause | ViolationKind::UnauthorizedDiscount))
            .filter(|v| matches!(v.location, Location::Offset { .. }))
            .collect();
        spliceable.sort_by_key(|v| match v.location {
            Location::Offset { start, .. } => std::cmp::Reverse(start),
            Location::Layer { .. } => std::cmp::Reverse(0),
        });

        let mut revised = text.to_string();
        for violation in spliceable {
            let Location::Offset { start, end } = violation.location else { continue };
            let replacement = match violation.kind {
                ViolationKind::UnauthorizedDiscount => "25% discount",
                ViolationKind::ProhibitedClause => "",
                _ => continue,
            };
            revised.replace_range(start..end, replacement);
        }

        for violation in violations {
            match violation.kind {
                ViolationKind::MissingWarranty => {
                    revised.push_str(
                        "\n\nStandard Warranty: The vendor warrants that all goods and services \
                         conform to agreed specifications and are free of material defects.",
                    );
                }
                ViolationKind::MissingRequiredClause => {
                    if let Some(reference) = &violation.policy_reference {
                        revised.push_str(&format!("\n\nAdded clause: {reference} terms apply per standard policy."));
                    }
                }
                _ => {}
            }
        }
        revised
    }

    /// 1.0 minus the mean severity weight across violations, floored at 0.0.
    fn compliance_score(violations: &[PolicyViolation]) -> f64 {
        let penalty: f64 = violations.iter().map(|v| v.severity.weight()).sum();
        let n = violations.len().max(1) as f64;
        (1.0 - penalty / n).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{DomainLayer, PolicyLayer};
    use crate::policy::PolicyStore;

    fn critic() -> GlobalPolicyCritic {
        GlobalPolicyCritic::new(Arc::new(PolicyStore::from_defaults()))
    }

    fn view<'a>(policy: &'a PolicyLayer, domain: &'a DomainLayer) -> CriticView<'a> {
        CriticView { policy, domain }
    }

    #[test]
    fn clean_text_is_approved() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "We warrant all goods delivered under this agreement, governed by the laws of Delaware.",
            view(&policy, &domain),
            None,
        );
        assert_eq!(outcome.action_taken, RevisionAction::Approved);
        assert_eq!(outcome.compliance_score, 1.0);
    }

    #[test]
    fn missing_warranty_is_auto_revised() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "We propose a 20% discount for this order, to be delivered next quarter.",
            view(&policy, &domain),
            None,
        );
        assert_eq!(outcome.action_taken, RevisionAction::AutoRevised);
        assert!(outcome.revised_text.is_some());
        assert!(outcome.revised_text.unwrap().to_lowercase().contains("warranty"));
    }

    #[test]
    fn prohibited_clause_is_rejected() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "This agreement grants unlimited liability to the buyer, with full warranty protection.",
            view(&policy, &domain),
            None,
        );
        assert_eq!(outcome.action_taken, RevisionAction::Rejected);
    }

    #[test]
    fn liability_waiver_is_spliced_out_on_auto_revise() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "Vendor waives liability for all damages and provides no warranty.",
            view(&policy, &domain),
            None,
        );
        assert_eq!(outcome.action_taken, RevisionAction::AutoRevised);
        let revised = outcome.revised_text.unwrap();
        assert!(!revised.contains("waives liability"));
    }

    #[test]
    fn unauthorized_discount_is_capped_to_25_percent_on_auto_revise() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "We will offer 35% discount to close this quarter, with full warranty protection.",
            view(&policy, &domain),
            None,
        );
        assert_eq!(outcome.action_taken, RevisionAction::AutoRevised);
        let revised = outcome.revised_text.unwrap();
        assert!(revised.contains("25% discount"));
        assert!(!revised.contains("35% discount"));
    }

    #[test]
    fn non_fixable_non_critical_requires_manual_review() {
        let critic = critic();
        let policy = PolicyLayer::default();
        let domain = DomainLayer::default();
        let outcome = critic.review(
            "Planned spend for software this quarter is well above threshold, with full warranty protection.",
            view(&policy, &domain),
            Some(("software", rust_decimal::Decimal::from(999_999))),
        );
        assert_eq!(outcome.action_taken, RevisionAction::ManualReviewRequired);
    }
}
