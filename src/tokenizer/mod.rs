//! Token Accountant: word/punctuation-based token estimation and budget
//! validation, grounded on the original `token_counter.py` but using `ceil`
//! instead of truncation per the governing formula.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classifies text so the right per-token multiplier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Plain,
    Code,
    Structured,
    Technical,
}

impl ContentKind {
    fn multiplier(self) -> f64 {
        match self {
            Self::Plain => 1.3,
            Self::Code => 1.5,
            Self::Structured => 1.2,
            Self::Technical => 1.4,
        }
    }
}

/// `ceil((words + 0.5 * punctuation) * multiplier)`, floored at 1 for any
/// non-empty input and 0 for empty/whitespace-only input.
pub fn estimate(text: &str, kind: ContentKind) -> u32 {
    if text.trim().is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count() as f64;
    let punctuation = text
        .chars()
        .filter(|c| c.is_ascii_punctuation())
        .count() as f64;
    let raw = (words + 0.5 * punctuation) * kind.multiplier();
    (raw.ceil() as u32).max(1)
}

/// Sum token estimates across a sequence of strings of the same kind.
pub fn sum_sequence<I, S>(items: I, kind: ContentKind) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| estimate(s.as_ref(), kind)).sum()
}

/// Sum token estimates across a `key: value` mapping, counting both sides.
pub fn sum_mapping(map: &HashMap<String, String>, kind: ContentKind) -> u32 {
    map.iter()
        .map(|(k, v)| estimate(k, kind) + estimate(v, kind))
        .sum()
}

/// Outcome of comparing an actual token count against a budget, allowing a
/// fractional tolerance before treating it as an overage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub actual: u32,
    pub budget: u32,
    pub tolerance: f64,
    pub within_budget: bool,
}

/// Validate `actual` against `budget` with a 5% default tolerance: passes if
/// `actual <= budget * (1 + tolerance)`.
pub fn validate_budget(actual: u32, budget: u32) -> BudgetCheck {
    validate_budget_with_tolerance(actual, budget, 0.05)
}

pub fn validate_budget_with_tolerance(actual: u32, budget: u32, tolerance: f64) -> BudgetCheck {
    let ceiling = (budget as f64 * (1.0 + tolerance)).floor() as u32;
    BudgetCheck {
        actual,
        budget,
        tolerance,
        within_budget: actual <= ceiling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_counts_zero() {
        assert_eq!(estimate("", ContentKind::Plain), 0);
        assert_eq!(estimate("   ", ContentKind::Plain), 0);
    }

    #[test]
    fn single_word_floors_at_one() {
        assert_eq!(estimate("hi", ContentKind::Plain), 2);
    }

    #[test]
    fn punctuation_adds_half_weight() {
        let words = 3.0;
        let punct = 2.0;
        let expected = ((words + 0.5 * punct) * 1.3_f64).ceil() as u32;
        assert_eq!(estimate("a, b, c.", ContentKind::Plain), expected);
    }

    #[test]
    fn kind_multipliers_differ() {
        let text = "fn main() { return 0; }";
        assert!(estimate(text, ContentKind::Code) >= estimate(text, ContentKind::Structured));
    }

    #[test]
    fn budget_tolerance_allows_small_overage() {
        let check = validate_budget(104, 100);
        assert!(check.within_budget);
        let check = validate_budget(106, 100);
        assert!(!check.within_budget);
    }

    #[test]
    fn sum_sequence_adds_each_item() {
        let items = vec!["one two", "three four five"];
        let total = sum_sequence(items, ContentKind::Plain);
        assert_eq!(
            total,
            estimate("one two", ContentKind::Plain) + estimate("three four five", ContentKind::Plain)
        );
    }
}
