//! Pattern detector - keyword classification of user messages
//!
//! Maps free text onto named intent categories. Each hit is recorded in the
//! knowledge store (usage count and example questions).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::knowledge::KnowledgeStore;

/// Keywords that mark a technical/programming question
const TECHNICAL_KEYWORDS: &[&str] = &[
    "برمجة",
    "كود",
    "سكريبت",
    "دالة",
    "صنف",
    "code",
    "script",
    "function",
];

/// Keywords asking for something to be better or faster
const IMPROVEMENT_KEYWORDS: &[&str] = &[
    "تحسين",
    "تطوير",
    "أفضل",
    "أسرع",
    "improve",
    "optimize",
];

/// Keywords reporting a failure
const ERROR_KEYWORDS: &[&str] = &[
    "خطأ",
    "لا يعمل",
    "مشكلة",
    "إصلاح",
    "error",
    "bug",
    "broken",
];

/// Keywords signalling the previous answer was not understood
const MISUNDERSTANDING_KEYWORDS: &[&str] = &[
    "لم أفهم",
    "لا أفهم",
    "غير واضح",
    "ماذا تقصد",
    "don't understand",
    "what do you mean",
];

/// One named category and the keywords that trigger it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub name: String,
    pub keywords: Vec<String>,
    pub response_style: String,
}

impl PatternDefinition {
    pub fn new(name: &str, keywords: &[&str], response_style: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            response_style: response_style.to_string(),
        }
    }

    /// Whether any keyword occurs in already-lowercased text
    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.to_lowercase().as_str()))
    }
}

/// Ordered category table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub patterns: Vec<PatternDefinition>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                PatternDefinition::new("technical", TECHNICAL_KEYWORDS, "detailed"),
                PatternDefinition::new("improvement", IMPROVEMENT_KEYWORDS, "suggestive"),
                PatternDefinition::new("error", ERROR_KEYWORDS, "diagnostic"),
                PatternDefinition::new("misunderstanding", MISUNDERSTANDING_KEYWORDS, "clarifying"),
            ],
        }
    }
}

impl PatternConfig {
    /// Category names whose keywords occur in `text`, in table order
    pub fn classify(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.patterns
            .iter()
            .filter(|p| p.matches(&lowered))
            .map(|p| p.name.clone())
            .collect()
    }
}

/// Keyword detector that records its hits
pub struct PatternDetector {
    config: PatternConfig,
    store: Arc<KnowledgeStore>,
}

impl PatternDetector {
    pub fn new(config: PatternConfig, store: Arc<KnowledgeStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Insert the configured categories into the store (existing rows kept)
    pub async fn seed(&self) -> Result<usize, StorageError> {
        self.store.seed_patterns(&self.config.patterns).await
    }

    /// Classify without touching the store
    pub fn classify(&self, text: &str) -> Vec<String> {
        self.config.classify(text)
    }

    /// Classify and record each hit. Storage failures are logged only.
    pub async fn detect(&self, text: &str) -> Vec<String> {
        let detected = self.classify(text);

        for name in &detected {
            match self.store.record_pattern_hit(name, text).await {
                Ok(true) => debug!("Pattern '{}' detected", name),
                Ok(false) => warn!("Pattern '{}' is not seeded in the store", name),
                Err(e) => warn!("Failed to record pattern '{}': {}", name, e),
            }
        }

        detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn detector() -> PatternDetector {
        let store = Arc::new(KnowledgeStore::in_memory().unwrap());
        let detector = PatternDetector::new(PatternConfig::default(), store);
        detector.seed().await.unwrap();
        detector
    }

    #[test]
    fn test_classify_uses_table_order() {
        let config = PatternConfig::default();
        // "error" keyword appears before the technical one in the text
        let hits = config.classify("عندي خطأ في الكود");
        assert_eq!(hits, vec!["technical", "error"]);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let config = PatternConfig::default();
        assert_eq!(config.classify("My CODE has a BUG"), vec!["technical", "error"]);
        assert!(config.classify("صباح الخير").is_empty());
    }

    #[test]
    fn test_multiword_keyword() {
        let config = PatternConfig::default();
        assert_eq!(config.classify("لم أفهم ما قلته"), vec!["misunderstanding"]);
    }

    #[tokio::test]
    async fn test_detect_is_stable_but_counts_each_call() {
        let detector = detector().await;

        let first = detector.detect("كيف أكتب دالة أسرع").await;
        let second = detector.detect("كيف أكتب دالة أسرع").await;
        assert_eq!(first, second);
        assert_eq!(first, vec!["technical", "improvement"]);

        let technical = detector.store.get_pattern("technical").await.unwrap().unwrap();
        assert_eq!(technical.usage_count, 2);
        assert_eq!(technical.example_questions.len(), 2);
        assert_eq!(technical.response_style.as_deref(), Some("detailed"));
    }

    #[tokio::test]
    async fn test_detect_without_seed_still_classifies() {
        let store = Arc::new(KnowledgeStore::in_memory().unwrap());
        let detector = PatternDetector::new(PatternConfig::default(), store);
        assert_eq!(detector.detect("هناك مشكلة").await, vec!["error"]);
    }
}
