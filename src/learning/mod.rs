//! Learning System
//!
//! Detects intent patterns, scores exchanges, turns valuable answers into
//! knowledge and schedules background fine-tuning.

pub mod detector;
pub mod feedback;
pub mod improvement;
pub mod metrics;

pub use detector::{PatternConfig, PatternDefinition, PatternDetector};
pub use feedback::{
    calculate_confidence, evaluate_response_quality, extract_topic, word_count, InteractionAnalysis,
    LearningEngine, LearningReport,
};
pub use improvement::{improvement_channel, ImprovementJob, ImprovementOutcome, ImprovementWorker};
pub use metrics::PerformanceMetrics;
