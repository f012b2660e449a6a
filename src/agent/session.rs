//! Assistant session
//!
//! Owns the dispatcher, context tracker and learning loop for one
//! conversation and runs the whole message pipeline one message at a time.

use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::context_manager::{ContextTracker, ConversationContext};
use super::dispatcher::ResponseDispatcher;
use crate::config::Config;
use crate::error::AssistantError;
use crate::knowledge::{KnowledgeStore, NewInteraction};
use crate::learning::{
    improvement_channel, ImprovementWorker, InteractionAnalysis, LearningEngine, LearningReport, PatternConfig,
    PatternDetector, PerformanceMetrics,
};
use crate::model::{HuggingFaceGenerator, ModelAdapter, TextGenerator};
use crate::types::{Emotion, Mode, Reply, ReplyMode, ReplySource, Sender};

/// Where replies and the loading indicator go
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink: Send + Sync {
    fn display(&self, text: &str, sender: Sender, mode: ReplyMode, emotion: Emotion);
    fn show_loading(&self);
    fn hide_loading(&self);
}

/// One conversation with the assistant
pub struct Assistant {
    store: Arc<KnowledgeStore>,
    model: Arc<ModelAdapter>,
    dispatcher: ResponseDispatcher,
    context: Mutex<ContextTracker>,
    learning: LearningEngine,
    detector: Arc<PatternDetector>,
    /// Held for the duration of one pipeline run
    in_flight: Mutex<()>,
    improvement_task: Option<JoinHandle<()>>,
}

impl Assistant {
    /// Open the configured store and hosted model
    pub async fn open(config: &Config) -> Result<Self> {
        let db_path = config.storage.resolve()?;
        let store = KnowledgeStore::open(&db_path)
            .await
            .with_context(|| format!("Failed to open knowledge store at {}", db_path.display()))?;

        let generator = HuggingFaceGenerator::from_config(&config.model)
            .context("Failed to create model client")?;
        if !generator.has_token() {
            warn!("No Hugging Face token configured; requests may be rate limited");
        }

        let assistant = Self::build(config, Arc::new(store), Arc::new(generator)).await?;
        Ok(assistant)
    }

    /// Wire an assistant from a store and a generation backend
    pub async fn build(
        config: &Config,
        store: Arc<KnowledgeStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, AssistantError> {
        validate(config)?;
        let model = Arc::new(ModelAdapter::new(generator, &config.model));

        let detector = Arc::new(PatternDetector::new(PatternConfig::default(), store.clone()));
        detector.seed().await?;
        store.common_questions().await?;

        let metrics = Arc::new(RwLock::new(PerformanceMetrics::default()));
        let mut learning = LearningEngine::new(
            detector.clone(),
            store.clone(),
            config.learning.clone(),
            metrics.clone(),
            model.name(),
        );

        let mut improvement_task = None;
        if config.learning.enabled {
            let (tx, rx) = improvement_channel();
            let worker = ImprovementWorker::new(store.clone(), model.clone(), metrics, config.learning.recent_limit);
            improvement_task = Some(worker.spawn(rx));
            learning = learning.with_improvements(tx);
        }

        let dispatcher = ResponseDispatcher::new(model.clone(), config.modes.clone()).with_store(store.clone());

        info!("Assistant ready (model: {}, mode: {})", model.name(), config.modes.initial);

        Ok(Self {
            store,
            model,
            dispatcher,
            context: Mutex::new(ContextTracker::default()),
            learning,
            detector,
            in_flight: Mutex::new(()),
            improvement_task,
        })
    }

    /// Process one message into a reply
    pub async fn handle(&self, message: &str) -> Reply {
        self.handle_with_analysis(message).await.0
    }

    /// Process one message and return the learning analysis alongside the
    /// reply. Validation and failure replies are not analyzed.
    pub async fn handle_with_analysis(&self, message: &str) -> (Reply, Option<InteractionAnalysis>) {
        let _guard = self.in_flight.lock().await;

        let reply = self.dispatcher.process(message).await;
        match reply.source {
            ReplySource::Validation => return (reply, None),
            ReplySource::Failure => {
                self.log_failure(message, &reply).await;
                return (reply, None);
            }
            _ => {}
        }

        self.context.lock().await.update(message, &reply.text);

        let analysis = match reply.source {
            ReplySource::Generated => {
                self.learning
                    .process_interaction_with_sentiment(message, &reply.text, Some(reply.emotion))
                    .await
            }
            _ => {
                self.learning
                    .process_fixed_reply(message, &reply.text, Some(reply.emotion))
                    .await
            }
        };
        debug!(
            "Analysis: patterns={:?} correct={} valuable={}",
            analysis.detected_patterns, analysis.is_correct, analysis.is_valuable
        );

        (reply, Some(analysis))
    }

    /// Dispatch only: no context update, logging or learning
    pub async fn probe(&self, message: &str) -> Reply {
        let _guard = self.in_flight.lock().await;
        self.dispatcher.process(message).await
    }

    async fn log_failure(&self, message: &str, reply: &Reply) {
        let record = NewInteraction {
            user_input: message.to_string(),
            ai_response: reply.text.clone(),
            sentiment: Some(reply.emotion),
            confidence: 0.0,
            ..Default::default()
        };
        if let Err(e) = self.store.log_interaction(&record).await {
            warn!("Failed to log failed interaction: {}", e);
        }
    }

    pub async fn context(&self) -> ConversationContext {
        self.context.lock().await.get_context()
    }

    /// Forget the recent exchanges and topic; stored facts are kept
    pub async fn clear_context(&self) {
        self.context.lock().await.clear();
    }

    pub async fn active_mode(&self) -> Mode {
        self.dispatcher.active_mode().await
    }

    pub async fn set_mode(&self, mode: Mode) {
        self.dispatcher.set_mode(mode).await;
    }

    pub fn greeting(&self) -> &'static str {
        super::greeting::greeting()
    }

    /// Store a personal fact and expose it to the conversation context
    pub async fn remember(&self, key: &str, value: &str) -> Result<(), AssistantError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AssistantError::Validation);
        }
        self.store.set_personal_info(key, value).await?;
        self.context.lock().await.set_user_info(key, value);
        Ok(())
    }

    pub async fn recall(&self, key: &str) -> Result<Option<String>, AssistantError> {
        Ok(self.store.get_personal_info(key).await?)
    }

    pub async fn learning_stats(&self) -> Result<LearningReport, AssistantError> {
        Ok(self.learning.learning_stats().await?)
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    pub fn model_name(&self) -> String {
        self.model.name()
    }

    /// Stop accepting improvement jobs and wait for queued ones to finish
    pub async fn shutdown(self) {
        let Assistant {
            learning,
            improvement_task,
            ..
        } = self;
        drop(learning);

        if let Some(task) = improvement_task {
            if let Err(e) = task.await {
                warn!("Improvement worker ended abnormally: {}", e);
            }
        }
    }
}

/// Reject settings the pipeline cannot run with
fn validate(config: &Config) -> Result<(), AssistantError> {
    if config.model.max_prompt_chars == 0 || config.model.max_output_chars == 0 {
        return Err(AssistantError::Config(
            "model.max_prompt_chars and model.max_output_chars must be positive".to_string(),
        ));
    }
    if config.learning.enabled && config.learning.recent_limit == 0 {
        return Err(AssistantError::Config(
            "learning.recent_limit must be positive when learning is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Run the pipeline for `message` on a background task, driving the sink's
/// loading indicator. There is no cancellation; dropping the handle only
/// discards the reply.
pub fn spawn_message(assistant: Arc<Assistant>, message: String, sink: Arc<dyn DisplaySink>) -> JoinHandle<Reply> {
    tokio::spawn(async move {
        sink.show_loading();
        let reply = assistant.handle(&message).await;
        sink.hide_loading();
        sink.display(&reply.text, Sender::Assistant, reply.mode, reply.emotion);
        reply
    })
}
