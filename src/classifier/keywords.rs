//! Keyword categories
//!
//! Case-insensitive substring membership against fixed keyword sets. Zero, one
//! or several categories may match the same text.

use serde::{Deserialize, Serialize};

use crate::config::KeywordConfig;

/// Keyword category a ticket text can fall into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Finance,
    AfterSales,
    Technical,
    Critical,
}

impl Category {
    /// Fixed evaluation order for `classify`.
    pub const ALL: [Category; 4] = [
        Category::Finance,
        Category::AfterSales,
        Category::Technical,
        Category::Critical,
    ];

    /// Categories that map to a team, in routing precedence order.
    pub const ROUTING: [Category; 3] = [Category::Finance, Category::AfterSales, Category::Technical];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Finance => write!(f, "Finance"),
            Category::AfterSales => write!(f, "After-Sales"),
            Category::Technical => write!(f, "Technical"),
            Category::Critical => write!(f, "Critical"),
        }
    }
}

/// Lower-cased keyword sets, one per category
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    finance: Vec<String>,
    after_sales: Vec<String>,
    technical: Vec<String>,
    critical: Vec<String>,
}

fn normalize(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

impl KeywordClassifier {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            finance: normalize(&config.finance),
            after_sales: normalize(&config.after_sales),
            technical: normalize(&config.technical),
            critical: normalize(&config.critical),
        }
    }

    fn keywords(&self, category: Category) -> &[String] {
        match category {
            Category::Finance => &self.finance,
            Category::AfterSales => &self.after_sales,
            Category::Technical => &self.technical,
            Category::Critical => &self.critical,
        }
    }

    /// Does `text` contain any keyword of `category`?
    pub fn matches(&self, category: Category, text: &str) -> bool {
        contains_any(&text.to_lowercase(), self.keywords(category))
    }

    /// Every matching category, in `Category::ALL` order.
    pub fn classify(&self, text: &str) -> Vec<Category> {
        let lowered = text.to_lowercase();
        Category::ALL
            .into_iter()
            .filter(|c| contains_any(&lowered, self.keywords(*c)))
            .collect()
    }

    /// First routing category that matches (finance, then after-sales, then technical).
    pub fn routing_category(&self, text: &str) -> Option<Category> {
        let lowered = text.to_lowercase();
        Category::ROUTING
            .into_iter()
            .find(|c| contains_any(&lowered, self.keywords(*c)))
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

/// `lowered_text` must already be lower-case; `keywords` likewise.
pub fn contains_any<S: AsRef<str>>(lowered_text: &str, keywords: &[S]) -> bool {
    keywords.iter().any(|k| lowered_text.contains(k.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        let c = KeywordClassifier::default();
        assert!(c.matches(Category::Finance, "Frage zur RECHNUNG 9855"));
        assert!(c.matches(Category::AfterSales, "Rücksendung angefordert"));
        assert!(c.matches(Category::AfterSales, "RÜCKGABE möglich?"));
        assert!(!c.matches(Category::Critical, "ganz normale Anfrage"));
    }

    #[test]
    fn classify_reports_every_category_in_fixed_order() {
        let c = KeywordClassifier::default();
        let cats = c.classify("URGENT: refund for invoice, API error");
        assert_eq!(
            cats,
            vec![
                Category::Finance,
                Category::AfterSales,
                Category::Technical,
                Category::Critical
            ]
        );
        assert!(c.classify("Hallo, wie geht's?").is_empty());
    }

    #[test]
    fn routing_category_prefers_finance_then_after_sales() {
        let c = KeywordClassifier::default();
        assert_eq!(c.routing_category("refund for invoice"), Some(Category::Finance));
        assert_eq!(c.routing_category("defekt, api problem"), Some(Category::AfterSales));
        assert_eq!(c.routing_category("installation failed"), Some(Category::Technical));
        assert_eq!(c.routing_category("urgent!"), None);
    }

    #[test]
    fn blank_configured_keywords_are_ignored() {
        let config = KeywordConfig {
            finance: vec![String::new(), "  ".to_string(), "Invoice".to_string()],
            ..KeywordConfig::default()
        };
        let c = KeywordClassifier::new(&config);
        assert!(!c.matches(Category::Finance, "anything at all"));
        assert!(c.matches(Category::Finance, "my invoice"));
    }
}
