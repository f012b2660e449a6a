//! Background model improvement
//!
//! Fine-tuning is queued from the message pipeline and executed on a
//! separate task so it never delays a reply.

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::metrics::PerformanceMetrics;
use crate::error::{AssistantError, ModelError};
use crate::knowledge::KnowledgeStore;
use crate::model::ModelAdapter;

/// A request for one fine-tuning step
#[derive(Debug, Clone, PartialEq)]
pub struct ImprovementJob {
    /// Pattern categories to draw samples from (empty = all interactions)
    pub categories: Vec<String>,
}

pub fn improvement_channel() -> (
    mpsc::UnboundedSender<ImprovementJob>,
    mpsc::UnboundedReceiver<ImprovementJob>,
) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImprovementOutcome {
    /// No matching interactions to learn from
    Skipped,
    Improved { loss: f64 },
}

/// Executes improvement jobs against the model adapter
pub struct ImprovementWorker {
    store: Arc<KnowledgeStore>,
    model: Arc<ModelAdapter>,
    metrics: Arc<RwLock<PerformanceMetrics>>,
    recent_limit: usize,
}

impl ImprovementWorker {
    pub fn new(
        store: Arc<KnowledgeStore>,
        model: Arc<ModelAdapter>,
        metrics: Arc<RwLock<PerformanceMetrics>>,
        recent_limit: usize,
    ) -> Self {
        Self {
            store,
            model,
            metrics,
            recent_limit,
        }
    }

    /// Run a single fine-tuning cycle
    pub async fn run_once(&self, job: &ImprovementJob) -> Result<ImprovementOutcome, AssistantError> {
        let interactions = self
            .store
            .recent_interactions(self.recent_limit, &job.categories)
            .await?;

        if interactions.is_empty() {
            debug!("No interactions for categories {:?}, skipping improvement", job.categories);
            return Ok(ImprovementOutcome::Skipped);
        }

        // Inputs serve as their own targets
        let samples: Vec<String> = interactions.into_iter().map(|i| i.user_input).collect();
        let loss = self.model.fine_tune(&samples).await?;
        self.model.save_weights().await?;

        let mut metrics = self.metrics.write().await;
        metrics.apply_loss(loss);
        info!(
            "Model improved on {} sample(s): loss={:.4}, accuracy={:.3}",
            samples.len(),
            loss,
            metrics.accuracy
        );

        Ok(ImprovementOutcome::Improved { loss })
    }

    /// Consume jobs until every sender is dropped. Failures are logged and
    /// the job is dropped.
    pub fn spawn(self, mut jobs: mpsc::UnboundedReceiver<ImprovementJob>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                match self.run_once(&job).await {
                    Ok(_) => {}
                    // Hosted backends cannot update weights; expected on every job
                    Err(AssistantError::Model(ModelError::Unsupported(what))) => {
                        debug!("Improvement cycle skipped: {} unavailable", what);
                    }
                    Err(e) => warn!("Improvement cycle skipped: {}", e),
                }
            }
            debug!("Improvement worker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::knowledge::NewInteraction;
    use crate::model::MockTextGenerator;

    async fn store_with(inputs: &[(&str, Option<&str>)]) -> Arc<KnowledgeStore> {
        let store = Arc::new(KnowledgeStore::in_memory().unwrap());
        for (input, pattern) in inputs {
            store
                .log_interaction(&NewInteraction {
                    user_input: input.to_string(),
                    ai_response: "ok".to_string(),
                    pattern_detected: pattern.map(|p| p.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    fn worker(store: Arc<KnowledgeStore>, mock: MockTextGenerator) -> (ImprovementWorker, Arc<RwLock<PerformanceMetrics>>) {
        let model = Arc::new(ModelAdapter::new(Arc::new(mock), &ModelConfig::default()));
        let metrics = Arc::new(RwLock::new(PerformanceMetrics::default()));
        (ImprovementWorker::new(store, model, metrics.clone(), 10), metrics)
    }

    #[tokio::test]
    async fn test_improves_on_matching_interactions() {
        let store = store_with(&[("a", Some("error")), ("b", None), ("c", Some("error"))]).await;
        let mut mock = MockTextGenerator::new();
        mock.expect_fine_tune()
            .withf(|samples: &[String]| samples == ["c".to_string(), "a".to_string()])
            .times(1)
            .returning(|_| Ok(1.0));
        mock.expect_save_weights().times(1).returning(|| Ok(()));

        let (worker, metrics) = worker(store, mock);
        let outcome = worker
            .run_once(&ImprovementJob { categories: vec!["error".to_string()] })
            .await
            .unwrap();

        assert_eq!(outcome, ImprovementOutcome::Improved { loss: 1.0 });
        assert_eq!(metrics.read().await.improvement_cycles, 1);
    }

    #[tokio::test]
    async fn test_skips_without_interactions() {
        let store = store_with(&[("a", Some("technical"))]).await;
        let mut mock = MockTextGenerator::new();
        mock.expect_fine_tune().never();

        let (worker, metrics) = worker(store, mock);
        let outcome = worker
            .run_once(&ImprovementJob { categories: vec!["error".to_string()] })
            .await
            .unwrap();

        assert_eq!(outcome, ImprovementOutcome::Skipped);
        assert_eq!(*metrics.read().await, PerformanceMetrics::default());
    }

    #[tokio::test]
    async fn test_unsupported_fine_tune_leaves_metrics() {
        let store = store_with(&[("a", None)]).await;
        let mut mock = MockTextGenerator::new();
        mock.expect_fine_tune()
            .returning(|_| Err(ModelError::Unsupported("fine-tuning")));
        mock.expect_save_weights().never();

        let (worker, metrics) = worker(store, mock);
        let result = worker.run_once(&ImprovementJob { categories: vec![] }).await;

        assert!(matches!(result, Err(AssistantError::Model(ModelError::Unsupported(_)))));
        assert_eq!(*metrics.read().await, PerformanceMetrics::default());
    }

    #[tokio::test]
    async fn test_spawned_worker_drains_queue() {
        let store = store_with(&[("a", None)]).await;
        let mut mock = MockTextGenerator::new();
        mock.expect_fine_tune().times(2).returning(|_| Ok(0.5));
        mock.expect_save_weights().times(2).returning(|| Ok(()));

        let (worker, metrics) = worker(store, mock);
        let (tx, rx) = improvement_channel();
        let handle = worker.spawn(rx);
        tx.send(ImprovementJob { categories: vec![] }).unwrap();
        tx.send(ImprovementJob { categories: vec![] }).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(metrics.read().await.improvement_cycles, 2);
    }
}
