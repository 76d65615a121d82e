//! The four deterministic policy checks plus an optional model-assisted
//! pass, grounded on `gp_critic.py`'s `_detect_violations`.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::{Location, PolicyViolation, Severity, ViolationKind};

use super::catalog::{ClauseRule, PROHIBITED_CLAUSES, REQUIRED_CLAUSES};

static DISCOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%\s*discount").unwrap());

/// Any bare percentage, used to recover a discount figure from free text when
/// it isn't phrased as "N% discount".
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap());

/// Minimum text length before we run the required-clause presence check.
/// Short snippets (a single clause under review, a fragment) trigger false
/// positives for "missing" termination/governing-law language that was
/// simply never in scope for that fragment.
const REQUIRED_CLAUSE_MIN_LEN: usize = 200;

/// Scan `text` for any prohibited clause variation. One violation per
/// canonical clause that matches, located at the first hit's byte offsets.
/// Severity and auto-fixability come from the clause's catalog entry, not a
/// single hardcoded value, so e.g. a liability waiver can be auto-revised
/// while unlimited liability cannot.
pub fn scan_prohibited_clauses(text: &str) -> Vec<PolicyViolation> {
    let lower = text.to_lowercase();
    let mut violations = Vec::new();
    for ClauseRule { canonical, variations, severity, auto_fixable } in PROHIBITED_CLAUSES.iter() {
        if let Some((start, end)) = first_match(&lower, variations) {
            violations.push(PolicyViolation {
                kind: ViolationKind::ProhibitedClause,
                severity: *severity,
                description: format!("text contains prohibited clause: {canonical}"),
                location: Location::Offset { start, end },
                suggested_fix: Some(format!("remove or renegotiate the '{canonical}' language")),
                auto_fixable: *auto_fixable,
                policy_reference: Some(canonical.to_string()),
            });
        }
    }
    violations
}

/// Required clauses other than warranty (which has its own dedicated check)
/// missing from a contract. Skipped entirely below `REQUIRED_CLAUSE_MIN_LEN`
/// since a short clause fragment was never going to contain boilerplate like
/// governing law.
pub fn check_missing_required_clauses(text: &str) -> Vec<PolicyViolation> {
    if text.len() < REQUIRED_CLAUSE_MIN_LEN {
        return Vec::new();
    }
    let lower = text.to_lowercase();
    REQUIRED_CLAUSES
        .iter()
        .filter(|(name, _)| *name != "warranty or guarantee")
        .filter_map(|(name, variations)| {
            let present = variations.iter().any(|v| lower.contains(v));
            if present {
                return None;
            }
            Some(PolicyViolation {
                kind: ViolationKind::MissingRequiredClause,
                severity: Severity::Medium,
                description: format!("text does not contain required clause: {name}"),
                location: Location::Layer { name: "output".to_string() },
                suggested_fix: Some(format!("add standard '{name}' language")),
                auto_fixable: true,
                policy_reference: Some(name.to_string()),
            })
        })
        .collect()
}

fn first_match(lower_text: &str, variations: &[&str]) -> Option<(usize, usize)> {
    variations
        .iter()
        .find_map(|needle| lower_text.find(needle).map(|start| (start, start + needle.len())))
}

/// A discount above 15% mentioned in text with no accompanying
/// warranty/guarantee/protection language is a `MissingWarranty` violation.
/// `discount_hint` takes priority (the caller's known `target_discount`,
/// already normalized to a percent); otherwise the first bare `NN%` in the
/// text is used. No discount figure at all means no violation.
pub fn check_missing_warranty(text: &str, discount_hint: Option<f64>) -> Option<PolicyViolation> {
    let discount_pct = match discount_hint {
        Some(pct) => pct,
        None => PERCENT_RE.captures(text)?[1].parse().ok()?,
    };
    if discount_pct <= 15.0 {
        return None;
    }
    let lower = text.to_lowercase();
    let (_, variations) = REQUIRED_CLAUSES
        .iter()
        .find(|(name, _)| *name == "warranty or guarantee")
        .expect("warranty entry present in REQUIRED_CLAUSES");
    let present = variations.iter().any(|v| lower.contains(v));
    if present {
        return None;
    }
    Some(PolicyViolation {
        kind: ViolationKind::MissingWarranty,
        severity: Severity::Medium,
        description: "output does not contain warranty or guarantee language".to_string(),
        location: Location::Layer { name: "output".to_string() },
        suggested_fix: Some("append standard warranty clause".to_string()),
        auto_fixable: true,
        policy_reference: Some("warranty or guarantee".to_string()),
    })
}

/// A discount percentage above 25% mentioned in text without an accompanying
/// compliance sign-off marker is an `UnauthorizedDiscount` violation.
pub fn check_unauthorized_discount(text: &str) -> Option<PolicyViolation> {
    let caps = DISCOUNT_RE.captures(text)?;
    let pct: f64 = caps[1].parse().ok()?;
    if pct <= 25.0 {
        return None;
    }
    let lower = text.to_lowercase();
    if lower.contains("compliance review") || lower.contains("executive approval") {
        return None;
    }
    let whole = caps.get(0).unwrap();
    Some(PolicyViolation {
        kind: ViolationKind::UnauthorizedDiscount,
        severity: Severity::High,
        description: format!("discount of {pct}% exceeds the 25% threshold without compliance sign-off"),
        location: Location::Offset { start: whole.start(), end: whole.end() },
        suggested_fix: Some("flag for Compliance agent review before committing to this discount".to_string()),
        auto_fixable: true,
        policy_reference: Some("unauthorized_discount".to_string()),
    })
}

/// Planned spend exceeding the category's configured budget threshold is a
/// `BudgetThresholdExceeded` violation.
pub fn check_budget_threshold(
    category: &str,
    amount: Decimal,
    thresholds: &HashMap<String, Decimal>,
) -> Option<PolicyViolation> {
    let threshold = thresholds.get(category)?;
    if amount <= *threshold {
        return None;
    }
    Some(PolicyViolation {
        kind: ViolationKind::BudgetThresholdExceeded,
        severity: Severity::Medium,
        description: format!(
            "planned spend {amount} for category '{category}' exceeds threshold {threshold}"
        ),
        location: Location::Layer { name: "policy".to_string() },
        suggested_fix: Some("route to executive approval workflow".to_string()),
        auto_fixable: false,
        policy_reference: Some(format!("budget_threshold::{category}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn detects_prohibited_clause() {
        let text = "This agreement grants unlimited liability to the buyer.";
        let violations = scan_prohibited_clauses(text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::ProhibitedClause);
    }

    #[test]
    fn missing_warranty_detected_above_15_percent_discount() {
        let text = "We offer a 20% reduction on this order.";
        let violation = check_missing_warranty(text, None).expect("discount above 15% with no warranty language");
        assert_eq!(violation.severity, Severity::Medium);
    }

    #[test]
    fn missing_warranty_skipped_at_or_below_15_percent_discount() {
        let text = "We offer a 10% reduction on this order.";
        assert!(check_missing_warranty(text, None).is_none());
    }

    #[test]
    fn missing_warranty_skipped_with_no_discount_figure() {
        let text = "This contract covers delivery terms only.";
        assert!(check_missing_warranty(text, None).is_none());
    }

    #[test]
    fn discount_hint_overrides_textual_percent() {
        let text = "Delivery within 30 days, no percentages mentioned.";
        assert!(check_missing_warranty(text, Some(20.0)).is_some());
        assert!(check_missing_warranty(text, Some(10.0)).is_none());
    }

    #[test]
    fn warranty_present_clears_check() {
        let text = "We offer a 20% reduction. The vendor provides a full warranty on all goods.";
        assert!(check_missing_warranty(text, None).is_none());
    }

    #[test]
    fn unauthorized_discount_flagged_above_threshold() {
        let text = "We propose a 30% discount on this order.";
        assert!(check_unauthorized_discount(text).is_some());
    }

    #[test]
    fn discount_with_compliance_marker_cleared() {
        let text = "We propose a 30% discount on this order, pending compliance review.";
        assert!(check_unauthorized_discount(text).is_none());
    }

    #[test]
    fn budget_threshold_exceeded() {
        let mut thresholds = HashMap::new();
        thresholds.insert("software".to_string(), dec!(50000));
        let result = check_budget_threshold("software", dec!(75000), &thresholds);
        assert!(result.is_some());
    }

    #[test]
    fn liability_waiver_is_auto_fixable() {
        let text = "Vendor waives liability for all damages and provides no warranty.";
        let violations = scan_prohibited_clauses(text);
        let hit = violations.iter().find(|v| v.policy_reference.as_deref() == Some("liability_waiver"));
        let hit = hit.expect("liability_waiver should match 'waives liability'");
        assert!(hit.auto_fixable);
        assert_eq!(hit.severity, Severity::High);
    }

    #[test]
    fn unlimited_liability_is_not_auto_fixable() {
        let violations = scan_prohibited_clauses("This grants unlimited liability to the buyer.");
        let hit = violations.iter().find(|v| v.policy_reference.as_deref() == Some("unlimited liability")).unwrap();
        assert!(!hit.auto_fixable);
        assert_eq!(hit.severity, Severity::Critical);
    }

    #[test]
    fn short_text_skips_required_clause_check() {
        let text = "Short clause under review.";
        assert!(check_missing_required_clauses(text).is_empty());
    }

    #[test]
    fn long_text_missing_governing_law_is_flagged() {
        let text = "a".repeat(250);
        let violations = check_missing_required_clauses(&text);
        assert!(violations.iter().any(|v| v.policy_reference.as_deref() == Some("governing law")));
    }
}
