//! Knowledge store
//!
//! Persistent storage for interactions, detected learning patterns, common
//! questions, personal facts and learned knowledge, backed by SQLite.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Emotion;

pub use sqlite::KnowledgeStore;

/// Examples kept per learning pattern (most recent wins)
pub const MAX_EXAMPLE_QUESTIONS: usize = 5;

/// Questions seeded into an empty common-questions table
pub const DEFAULT_COMMON_QUESTIONS: &[(&str, &str)] = &[
    ("ما هو اسمك؟", "أنا ماني، مساعدك الذكي!"),
    ("كيف اتواصل معك", "يمكنك التحدث معي مباشرة هنا أو استخدام الأمر 'مساعدة'"),
    ("من أنا", "أنت المستخدم الذي أتفاعل معه وأتعلم منه يومياً"),
];

/// Knowledge seeded on first open
pub const DEFAULT_KNOWLEDGE: &[(&str, &str)] = &[
    ("البرمجة بلغة بايثون", "بايثون لغة برمجة عالية المستوى سهلة التعلم"),
    ("تحسين الأداء", "تحسين الأداء يتطلب تحليل الاختناقات وتطبيق الحلول المناسبة"),
];

/// A logged user/assistant exchange; never mutated after insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: i64,
    pub user_input: String,
    pub ai_response: String,
    pub timestamp: DateTime<Utc>,
    pub is_valuable: bool,
    pub pattern_detected: Option<String>,
    pub sentiment: Option<Emotion>,
    pub confidence: f64,
}

/// Fields supplied when logging an interaction
#[derive(Debug, Clone, Default)]
pub struct NewInteraction {
    pub user_input: String,
    pub ai_response: String,
    pub is_valuable: bool,
    pub pattern_detected: Option<String>,
    pub sentiment: Option<Emotion>,
    pub confidence: f64,
}

/// Persisted statistics for one pattern category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPattern {
    pub name: String,
    pub detection_keywords: Vec<String>,
    pub example_questions: Vec<String>,
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub response_style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonQuestion {
    pub question: String,
    pub answer: String,
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
}

/// A learned topic with a heuristic confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub topic: String,
    pub details: String,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternUsage {
    pub name: String,
    pub count: u64,
}

/// Aggregate counters over the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_interactions: u64,
    pub valuable_interactions: u64,
    pub knowledge_items: u64,
    pub top_patterns: Vec<PatternUsage>,
}

/// Normalize a question for comparison: lowercase, no terminal punctuation,
/// single spaces
pub fn normalize_question(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '?' | '؟' | '.' | '!' | '،' | ','))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_question() {
        assert_eq!(normalize_question("  ما هو   اسمك؟ "), "ما هو اسمك");
        assert_eq!(normalize_question("Who ARE you?!"), "who are you");
    }
}
