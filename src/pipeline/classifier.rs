//! Lead classifier: maps form answers to an urgency tier.
//!
//! Rules are evaluated in order and the first match wins. Each rule fires
//! on the budget answer OR the timeline answer, so a short timeline
//! promotes a lead even when its budget alone would rank lower.

use tracing::debug;

use crate::pipeline::types::{AnswerSet, UrgencyTier};

/// One tier rule: matches when the budget is any of `budgets` or the
/// timeline is any of `timelines`.
#[derive(Debug, Clone, Copy)]
struct TierRule {
    tier: UrgencyTier,
    budgets: &'static [&'static str],
    timelines: &'static [&'static str],
}

impl TierRule {
    fn matches(&self, budget: &str, timeline: &str) -> bool {
        self.budgets.iter().any(|b| *b == budget) || self.timelines.iter().any(|t| *t == timeline)
    }
}

const TIER_RULES: [TierRule; 2] = [
    TierRule {
        tier: UrgencyTier::Hot,
        budgets: &["5-8 млн ₽", "Более 8 млн ₽"],
        timelines: &["В ближайший месяц"],
    },
    TierRule {
        tier: UrgencyTier::Warm,
        budgets: &["3-5 млн ₽"],
        timelines: &["В течение 3-6 месяцев"],
    },
];

/// Classify a lead. Total: missing answers count as empty.
pub fn classify(answers: &AnswerSet) -> UrgencyTier {
    let budget = answers.budget();
    let timeline = answers.timeline();

    let tier = TIER_RULES
        .iter()
        .find(|rule| rule.matches(budget, timeline))
        .map(|rule| rule.tier)
        .unwrap_or(UrgencyTier::Cold);

    debug!(budget, timeline, tier = tier.label(), "Lead classified");
    tier
}
