use crate::table::Table;
use regex::Regex;

pub const OTHER: &str = "Other";

/// SLA and compliance phrasing, checked in order before keywords.
pub const PATTERN_RULES: &[(&str, &str)] = &[
    (r"open and resolution time has not started", "Open - Not Started"),
    (r"not compliant.*still open", "Non-Compliant - Open"),
    (r"opened within.*estimated resolution", "Compliant - On Time"),
    (r"not compliant.*status of open", "Non-Compliant - Open Status"),
    (r"not been resolved.*estimated", "Non-Compliant - Overdue"),
    (r"resolved within.*2 hours", "Compliant - Resolved"),
];

/// Single-keyword substring rules, first hit wins.
pub const KEYWORD_RULES: &[(&str, &str)] = &[
    ("login", "Brute Force"),
    ("failed", "Brute Force"),
    ("ddos", "DDoS"),
    ("scan", "Port Scan"),
    ("outbound", "Data Exfiltration"),
    ("sla", "SLA"),
    ("compliant", "Compliant"),
    // unreachable: "compliant" matches first
    ("non-compliant", "Non-Compliant"),
    ("malware", "Malware"),
];

const DESCRIPTIVE_NAME_HINTS: [&str; 3] = ["description", "message", "text"];

#[derive(Debug, Clone)]
enum Rule {
    Pattern(Regex),
    Keyword(String),
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Rule::Pattern(re) => re.is_match(lowered),
            Rule::Keyword(k) => lowered.contains(k.as_str()),
        }
    }
}

/// Maps free text onto a small fixed label set.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(Rule, String)>,
    descriptive_min_len: f64,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(PATTERN_RULES, KEYWORD_RULES, 40.0).expect("built-in rules compile")
    }
}

impl Categorizer {
    /// Build from ordered pattern rules (evaluated first) and keyword rules.
    pub fn new(patterns: &[(&str, &str)], keywords: &[(&str, &str)], descriptive_min_len: f64) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(patterns.len() + keywords.len());
        for (p, label) in patterns {
            rules.push((Rule::Pattern(Regex::new(p)?), label.to_string()));
        }
        for (k, label) in keywords {
            rules.push((Rule::Keyword(k.to_lowercase()), label.to_string()));
        }
        Ok(Self { rules, descriptive_min_len })
    }

    pub fn with_descriptive_min_len(mut self, len: f64) -> Self {
        self.descriptive_min_len = len;
        self
    }

    /// Label for a piece of text; never fails and falls back to `Other`.
    pub fn classify(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(&lowered))
            .map(|(_, label)| label.as_str())
            .unwrap_or(OTHER)
    }

    /// Whether a column holds free text that should be categorized before it is
    /// used as a chart dimension.
    pub fn is_descriptive(&self, table: &Table, column: &str) -> bool {
        let name = column.to_lowercase();
        DESCRIPTIVE_NAME_HINTS.iter().any(|h| name.contains(h))
            || table.mean_text_len(column) > self.descriptive_min_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_win_over_keywords() {
        let c = Categorizer::default();
        // "sla" alone would map to SLA
        assert_eq!(c.classify("SLA: ticket is not compliant and is still open"), "Non-Compliant - Open");
        assert_eq!(c.classify("SLA breached"), "SLA");
    }

    #[test]
    fn compliant_keyword_shadows_non_compliant() {
        let c = Categorizer::default();
        assert_eq!(c.classify("Ticket marked non-compliant"), "Compliant");
        assert_eq!(c.classify("Ticket marked compliant"), "Compliant");
    }

    #[test]
    fn custom_rules_are_ordered() {
        let c = Categorizer::new(&[], &[("beta", "B"), ("alpha", "A")], 40.0).unwrap();
        assert_eq!(c.classify("alpha beta"), "B");
        assert_eq!(c.classify("gamma"), OTHER);
    }
}
