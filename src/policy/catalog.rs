//! Static catalogs of prohibited and required contract clauses, grounded on
//! `gpc_manager.py`'s `_load_compliance_rules` and the clause lists used by
//! `gp_critic.py`'s violation detection.

use once_cell::sync::Lazy;

use crate::domain::Severity;

/// One catalog entry: a canonical clause name, the phrase variations that
/// count as a match, and how the critic should treat a hit. `Critical` +
/// non-fixable clauses force rejection; `High`/auto-fixable ones can be
/// spliced out of the text automatically.
pub struct ClauseRule {
    pub canonical: &'static str,
    pub variations: &'static [&'static str],
    pub severity: Severity,
    pub auto_fixable: bool,
}

/// Prohibited clauses. Matching is case-insensitive substring search against
/// lowercased contract text.
pub static PROHIBITED_CLAUSES: Lazy<Vec<ClauseRule>> = Lazy::new(|| {
    vec![
        ClauseRule {
            canonical: "unlimited liability",
            variations: &["unlimited liability", "without limitation of liability", "no cap on liability"],
            severity: Severity::Critical,
            auto_fixable: false,
        },
        ClauseRule {
            canonical: "automatic renewal without notice",
            variations: &["automatically renew", "auto-renew without notice", "automatic renewal"],
            severity: Severity::Medium,
            auto_fixable: true,
        },
        ClauseRule {
            canonical: "unilateral price increase",
            variations: &["sole discretion to increase price", "unilateral price change", "price increase at any time"],
            severity: Severity::High,
            auto_fixable: false,
        },
        ClauseRule {
            canonical: "waiver of consequential damages exclusion",
            variations: &["waives all rights to consequential damages", "no liability for any damages"],
            severity: Severity::High,
            auto_fixable: false,
        },
        ClauseRule {
            canonical: "perpetual license grant",
            variations: &["perpetual, irrevocable license", "in perpetuity"],
            severity: Severity::Critical,
            auto_fixable: false,
        },
        ClauseRule {
            canonical: "liability_waiver",
            variations: &["waives liability", "waive liability", "no liability for", "not liable for any"],
            severity: Severity::High,
            auto_fixable: true,
        },
    ]
});

/// Clauses that must be present; absence is a `MissingRequiredClause`
/// violation. Each entry pairs a canonical name with the regex-ish phrase
/// fragments the validator checks for via `validator::warranty_present`.
pub static REQUIRED_CLAUSES: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "warranty or guarantee",
            vec!["warrant", "warranty", "warranties", "guarantee", "protection"],
        ),
        (
            "termination for cause",
            vec!["terminate for cause", "termination for breach"],
        ),
        (
            "governing law",
            vec!["governing law", "governed by the laws of"],
        ),
    ]
});

/// Default per-category spend thresholds, used when the environment does not
/// override them. Mirrors `gpc_manager.py`'s fixed OKR/guardrail defaults.
pub fn default_budget_thresholds() -> Vec<(&'static str, u64)> {
    vec![("software", 50_000), ("hardware", 100_000), ("services", 25_000)]
}

pub fn default_enterprise_okrs() -> Vec<&'static str> {
    vec![
        "Reduce total procurement spend by 12% year over year",
        "Consolidate vendor count in redundant categories",
        "Maintain supplier diversity targets across all regions",
        "Achieve 95% contract compliance across active vendors",
        "Cut average negotiation cycle time to under 10 business days",
    ]
}

pub fn default_compliance_guardrails() -> Vec<&'static str> {
    vec![
        "No contract may waive statutory consumer protections",
        "No contract may bind the enterprise beyond a 5-year term without executive sign-off",
        "All data processing terms must satisfy applicable privacy law",
        "No single vendor may exceed 40% of category spend without a risk review",
        "All discounts above 25% require Compliance agent review",
    ]
}

pub fn default_legal_requirements() -> Vec<&'static str> {
    vec![
        "Contracts must specify a governing law and venue",
        "Contracts must include a termination-for-cause clause",
        "Contracts must not contain unlimited liability exposure",
        "Contracts must preserve the right to audit vendor compliance",
        "Contracts must include data protection and confidentiality terms",
    ]
}
