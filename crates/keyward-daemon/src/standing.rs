//! Standing-approval rule matching.

use keyward_config::StandingRule;

/// Rule table evaluated against (item, reason) pairs.
///
/// Rules are scanned in configuration order; the first match wins. An empty
/// reason never matches any rule.
pub struct StandingRules {
    rules: Vec<StandingRule>,
}

impl StandingRules {
    /// Create a table from configuration order.
    #[must_use]
    pub fn new(rules: Vec<StandingRule>) -> Self {
        Self { rules }
    }

    /// Find the first rule matching the item and reason.
    #[must_use]
    pub fn find_match(&self, item: &str, reason: &str) -> Option<&StandingRule> {
        if reason.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.item == item && pattern_matches(&rule.reason_match, reason))
    }

    /// Number of configured rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Exact match, or prefix match when the pattern ends with a single
/// trailing `*`. The asterisk is not otherwise special.
fn pattern_matches(pattern: &str, reason: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) if !prefix.ends_with('*') => reason.starts_with(prefix),
        _ => pattern == reason,
    }
}
