//! Learning feedback loop
//!
//! Scores each exchange, logs it, turns valuable exchanges into knowledge and
//! queues a fine-tuning step when a reply looks wrong.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::detector::PatternDetector;
use super::improvement::ImprovementJob;
use super::metrics::PerformanceMetrics;
use crate::config::LearningConfig;
use crate::error::StorageError;
use crate::knowledge::{KnowledgeStore, LearningStats, NewInteraction};
use crate::types::Emotion;

/// Pattern whose presence adds the technical confidence bonus
const TECHNICAL_PATTERN: &str = "technical";

/// What the loop concluded about one exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionAnalysis {
    pub detected_patterns: Vec<String>,
    pub is_correct: bool,
    pub is_valuable: bool,
    pub requires_improvement: bool,
    pub confidence: f64,
    /// Topic stored as knowledge, when the exchange was valuable
    pub topic: Option<String>,
    pub interaction_id: Option<i64>,
    pub improvement_queued: bool,
}

/// Store statistics plus live metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningReport {
    pub model: String,
    pub enabled: bool,
    pub stats: LearningStats,
    pub metrics: PerformanceMetrics,
}

pub struct LearningEngine {
    detector: Arc<PatternDetector>,
    store: Arc<KnowledgeStore>,
    config: LearningConfig,
    metrics: Arc<RwLock<PerformanceMetrics>>,
    improvements: Option<mpsc::UnboundedSender<ImprovementJob>>,
    model_name: String,
}

impl LearningEngine {
    pub fn new(
        detector: Arc<PatternDetector>,
        store: Arc<KnowledgeStore>,
        config: LearningConfig,
        metrics: Arc<RwLock<PerformanceMetrics>>,
        model_name: String,
    ) -> Self {
        Self {
            detector,
            store,
            config,
            metrics,
            improvements: None,
            model_name,
        }
    }

    /// Queue fine-tuning jobs on `sender`; without one, improvements are only logged
    pub fn with_improvements(mut self, sender: mpsc::UnboundedSender<ImprovementJob>) -> Self {
        self.improvements = Some(sender);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn metrics(&self) -> Arc<RwLock<PerformanceMetrics>> {
        self.metrics.clone()
    }

    pub async fn process_interaction(&self, user_input: &str, ai_response: &str) -> InteractionAnalysis {
        self.process_interaction_with_sentiment(user_input, ai_response, None).await
    }

    /// Analyze, persist and learn from one exchange. Never fails; storage
    /// problems are logged and the affected step is skipped.
    pub async fn process_interaction_with_sentiment(
        &self,
        user_input: &str,
        ai_response: &str,
        sentiment: Option<Emotion>,
    ) -> InteractionAnalysis {
        if !self.config.enabled {
            let record = NewInteraction {
                user_input: user_input.to_string(),
                ai_response: ai_response.to_string(),
                sentiment,
                confidence: 0.5,
                ..Default::default()
            };
            let interaction_id = self.log(&record).await;
            return InteractionAnalysis {
                interaction_id,
                ..Default::default()
            };
        }

        let detected_patterns = self.detector.detect(user_input).await;
        let is_correct = evaluate_response_quality(user_input, ai_response, &self.config);
        let is_valuable = word_count(user_input) > self.config.valuable_min_words && is_correct;
        let requires_improvement = !is_correct
            || detected_patterns
                .iter()
                .any(|p| self.config.improvement_triggers.contains(p));
        let confidence = calculate_confidence(is_correct, ai_response, &detected_patterns, &self.config);

        let record = NewInteraction {
            user_input: user_input.to_string(),
            ai_response: ai_response.to_string(),
            is_valuable,
            pattern_detected: detected_patterns.first().cloned(),
            sentiment,
            confidence,
        };
        let interaction_id = self.log(&record).await;

        let mut topic = None;
        if is_valuable {
            let extracted = extract_topic(user_input, &self.config);
            match self.store.upsert_knowledge(&extracted, ai_response, confidence).await {
                Ok(()) => {
                    debug!("Learned '{}' (confidence {:.2})", extracted, confidence);
                    topic = Some(extracted);
                }
                Err(e) => warn!("Failed to store knowledge: {}", e),
            }
        }

        let improvement_queued = requires_improvement && self.queue_improvement(&detected_patterns);

        InteractionAnalysis {
            detected_patterns,
            is_correct,
            is_valuable,
            requires_improvement,
            confidence,
            topic,
            interaction_id,
            improvement_queued,
        }
    }

    /// Log an exchange answered from a fixed table (command, canned answer or
    /// stored question). Pattern hits are still counted, but the reply is not
    /// scored against the input and never becomes knowledge or a fine-tuning job.
    pub async fn process_fixed_reply(
        &self,
        user_input: &str,
        reply: &str,
        sentiment: Option<Emotion>,
    ) -> InteractionAnalysis {
        let detected_patterns = if self.config.enabled {
            self.detector.detect(user_input).await
        } else {
            Vec::new()
        };
        let confidence = if self.config.enabled {
            calculate_confidence(true, reply, &detected_patterns, &self.config)
        } else {
            0.5
        };

        let record = NewInteraction {
            user_input: user_input.to_string(),
            ai_response: reply.to_string(),
            is_valuable: false,
            pattern_detected: detected_patterns.first().cloned(),
            sentiment,
            confidence,
        };
        let interaction_id = self.log(&record).await;

        InteractionAnalysis {
            detected_patterns,
            is_correct: true,
            confidence,
            interaction_id,
            ..Default::default()
        }
    }

    async fn log(&self, record: &NewInteraction) -> Option<i64> {
        match self.store.log_interaction(record).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to log interaction: {}", e);
                None
            }
        }
    }

    fn queue_improvement(&self, categories: &[String]) -> bool {
        let Some(sender) = &self.improvements else {
            debug!("No improvement worker attached, skipping fine-tuning request");
            return false;
        };

        let job = ImprovementJob {
            categories: categories.to_vec(),
        };
        match sender.send(job) {
            Ok(()) => true,
            Err(_) => {
                warn!("Improvement worker is gone, skipping fine-tuning request");
                false
            }
        }
    }

    pub async fn learning_stats(&self) -> Result<LearningReport, StorageError> {
        let stats = self.store.learning_stats().await?;
        let metrics = *self.metrics.read().await;
        Ok(LearningReport {
            model: self.model_name.clone(),
            enabled: self.config.enabled,
            stats,
            metrics,
        })
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Heuristic correctness: long enough, no hedging, and shares words with the input
pub fn evaluate_response_quality(user_input: &str, ai_response: &str, config: &LearningConfig) -> bool {
    if word_count(ai_response) < config.min_response_words {
        return false;
    }

    let response = ai_response.to_lowercase();
    if config
        .hedging_phrases
        .iter()
        .any(|p| !p.is_empty() && response.contains(p.to_lowercase().as_str()))
    {
        return false;
    }

    let input_words: HashSet<String> = user_input
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();
    let response_words: HashSet<&str> = response.split_whitespace().collect();

    input_words
        .iter()
        .filter(|w| response_words.contains(w.as_str()))
        .count()
        >= config.min_overlap
}

/// Best-effort topic: the clause before a question mark, else the words after
/// the first connector word, else the first few words
pub fn extract_topic(text: &str, config: &LearningConfig) -> String {
    let text = text.trim();

    if let Some(idx) = text.find(|c| c == '?' || c == '؟') {
        let clause = text[..idx].trim();
        if !clause.is_empty() {
            return clause.to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if let Some(pos) = words
        .iter()
        .position(|w| config.topic_connectors.iter().any(|c| c == w))
    {
        let rest = words[pos + 1..].join(" ");
        if !rest.is_empty() {
            return rest;
        }
    }

    words
        .into_iter()
        .take(config.topic_fallback_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Confidence in [0, 1] for a learned answer
pub fn calculate_confidence(
    is_correct: bool,
    ai_response: &str,
    detected_patterns: &[String],
    config: &LearningConfig,
) -> f64 {
    let base = if is_correct {
        config.correct_base
    } else {
        config.incorrect_base
    };

    let length_bonus = if config.length_normalizer > 0.0 {
        (word_count(ai_response) as f64 / config.length_normalizer).min(config.length_bonus_cap)
    } else {
        0.0
    };

    let technical_bonus = if detected_patterns.iter().any(|p| p == TECHNICAL_PATTERN) {
        config.technical_bonus
    } else {
        0.0
    };

    let score = base + length_bonus + technical_bonus;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
