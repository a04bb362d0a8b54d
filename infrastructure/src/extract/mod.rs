//! Fixed-pattern prompt extractor.
//!
//! [`PatternExtractor`] is the regex-backed implementation of the domain's
//! [`PromptExtractor`] strategy. Patterns are compiled once at
//! construction; classification is first-match-wins in the order
//! pr → pricing → deployment → general.

use opsgate_domain::{Intent, PromptExtractor};
use regex::Regex;

/// Regex-based extractor over fixed patterns.
pub struct PatternExtractor {
    pr_intent: Regex,
    pricing_intent: Regex,
    deploy_intent: Regex,
    pr_worded: Regex,
    pr_hash: Regex,
    stack_name: Regex,
    stack_mention: Regex,
    template_mention: Regex,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self {
            // Word-bounded so "price" never matches the pr pattern
            pr_intent: Regex::new(r"(?i)\b(pull\s+request|pr)\b|#\d+").expect("valid pattern"),
            pricing_intent: Regex::new(r"(?i)\b(cost|price|pricing|estimate)\b")
                .expect("valid pattern"),
            deploy_intent: Regex::new(r"(?i)\b(deploy|deployment|deployments|release)\b")
                .expect("valid pattern"),
            pr_worded: Regex::new(r"(?i)\b(?:pull\s+request|pr)\s*#?\s*(\d+)")
                .expect("valid pattern"),
            pr_hash: Regex::new(r"#(\d+)").expect("valid pattern"),
            stack_name: Regex::new(r"(?i)\bstack\s+(?:named\s+|called\s+)?([A-Za-z][A-Za-z0-9-]{2,127})")
                .expect("valid pattern"),
            stack_mention: Regex::new(r"(?i)\bstacks?\b").expect("valid pattern"),
            template_mention: Regex::new(r"(?i)\btemplates?\b").expect("valid pattern"),
        }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptExtractor for PatternExtractor {
    fn intent(&self, prompt: &str) -> Intent {
        if self.pr_intent.is_match(prompt) {
            Intent::Pr
        } else if self.pricing_intent.is_match(prompt) {
            Intent::Pricing
        } else if self.deploy_intent.is_match(prompt) {
            Intent::Deployment
        } else {
            Intent::General
        }
    }

    fn pr_number(&self, prompt: &str) -> Option<u64> {
        // "pull request 7" / "PR #7" before a bare "#7"
        self.pr_worded
            .captures(prompt)
            .or_else(|| self.pr_hash.captures(prompt))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn stack_name(&self, prompt: &str) -> Option<String> {
        let candidate = self
            .stack_name
            .captures(prompt)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())?;
        // Filler words after "stack" are not names
        let lowered = candidate.to_lowercase();
        if matches!(lowered.as_str(), "cost" | "costs" | "that" | "this" | "the") {
            return None;
        }
        Some(candidate)
    }

    fn mentions_existing_stack(&self, prompt: &str) -> bool {
        self.stack_mention.is_match(prompt) && !self.template_mention.is_match(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new()
    }

    #[test]
    fn test_intent_pr_beats_pricing() {
        // Ordered first-match-wins: pr patterns are checked first
        assert_eq!(
            extractor().intent("Estimate the cost impact of PR #4"),
            Intent::Pr
        );
    }

    #[test]
    fn test_intent_categories() {
        let e = extractor();
        assert_eq!(e.intent("Analyze pull request 12"), Intent::Pr);
        assert_eq!(e.intent("What does this template cost monthly?"), Intent::Pricing);
        assert_eq!(e.intent("Show deployment frequency for last month"), Intent::Deployment);
        assert_eq!(e.intent("List ECS clusters"), Intent::General);
    }

    #[test]
    fn test_price_does_not_match_pr_word() {
        assert_eq!(extractor().intent("What is the price of this?"), Intent::Pricing);
    }

    #[test]
    fn test_pr_number_patterns() {
        let e = extractor();
        assert_eq!(e.pr_number("Analyze PR #9"), Some(9));
        assert_eq!(e.pr_number("check pull request 42 please"), Some(42));
        assert_eq!(e.pr_number("see #123"), Some(123));
        assert_eq!(e.pr_number("no number here"), None);
    }

    #[test]
    fn test_worded_pr_number_wins_over_bare_hash() {
        // "pull request 7" is the explicit reference even with "#2" earlier
        assert_eq!(
            extractor().pr_number("re #2: what about pull request 7?"),
            Some(7)
        );
    }

    #[test]
    fn test_stack_name_extraction() {
        let e = extractor();
        assert_eq!(
            e.stack_name("How much does stack orders-prod cost?").as_deref(),
            Some("orders-prod")
        );
        assert_eq!(
            e.stack_name("price the stack named billing-staging").as_deref(),
            Some("billing-staging")
        );
        assert_eq!(e.stack_name("how much does my stack cost?"), None);
    }

    #[test]
    fn test_existing_stack_vs_template() {
        let e = extractor();
        assert!(e.mentions_existing_stack("cost of stack orders-prod"));
        assert!(!e.mentions_existing_stack("cost of this template"));
        // A template question that also says "stack" is treated as template
        assert!(!e.mentions_existing_stack("cost of the stack this template creates"));
        assert!(!e.mentions_existing_stack("list clusters"));
    }
}
