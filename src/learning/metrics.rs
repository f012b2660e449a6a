//! In-memory performance metrics, smoothed on each improvement cycle

use serde::{Deserialize, Serialize};

/// Smoothing weight kept from the previous accuracy
const ACCURACY_DECAY: f64 = 0.9;
const RESPONSE_TIME_DECAY: f64 = 0.95;
const ADAPTABILITY_STEP: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub response_time: f64,
    pub adaptability: f64,
    /// Completed improvement cycles
    pub improvement_cycles: u64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            accuracy: 0.75,
            response_time: 2.5,
            adaptability: 0.65,
            improvement_cycles: 0,
        }
    }
}

impl PerformanceMetrics {
    /// Fold the loss of one fine-tuning step into the metrics
    pub fn apply_loss(&mut self, loss: f64) {
        let new_accuracy = 1.0 - loss / 10.0;
        self.accuracy = ACCURACY_DECAY * self.accuracy + (1.0 - ACCURACY_DECAY) * new_accuracy;
        self.response_time *= RESPONSE_TIME_DECAY;
        self.adaptability = (self.adaptability + ADAPTABILITY_STEP).min(1.0);
        self.improvement_cycles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_loss() {
        let mut metrics = PerformanceMetrics::default();
        metrics.apply_loss(2.0);
        assert!((metrics.accuracy - (0.9 * 0.75 + 0.1 * 0.8)).abs() < 1e-9);
        assert!((metrics.response_time - 2.375).abs() < 1e-9);
        assert!((metrics.adaptability - 0.67).abs() < 1e-9);
        assert_eq!(metrics.improvement_cycles, 1);
    }

    #[test]
    fn test_adaptability_saturates() {
        let mut metrics = PerformanceMetrics::default();
        for _ in 0..50 {
            metrics.apply_loss(0.0);
        }
        assert_eq!(metrics.adaptability, 1.0);
    }
}
