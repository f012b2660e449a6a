//! Model adapter
//!
//! Wraps a text-generation backend behind a single `generate` call with
//! prompt/output cleaning. Generation fails closed: callers always get text.

pub mod huggingface;
pub mod sanitize;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{ModeParams, ModelConfig};
use crate::error::ModelError;

pub use huggingface::HuggingFaceGenerator;
pub use sanitize::{clean_input, clean_output, SanitizeSettings};

/// Sampling engine constants, not caller-configurable
pub const TOP_K: u32 = 50;
pub const TOP_P: f32 = 0.95;
pub const REPETITION_PENALTY: f32 = 1.5;

/// Prefix of every diagnostic string produced by a failed generation
pub const ERROR_MARKER: &str = "Error:";

/// Parameters for one generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_length: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    /// Token window the backend truncates the prompt to
    pub token_window: usize,
}

impl GenerationParams {
    /// Temperature is clamped into (0, 1]
    pub fn new(max_length: u32, temperature: f32) -> Self {
        let temperature = if temperature.is_nan() {
            1.0
        } else {
            temperature.clamp(0.01, 1.0)
        };
        Self {
            max_length,
            temperature,
            top_k: TOP_K,
            top_p: TOP_P,
            repetition_penalty: REPETITION_PENALTY,
            token_window: 512,
        }
    }

    pub fn with_token_window(mut self, token_window: usize) -> Self {
        self.token_window = token_window;
        self
    }
}

impl From<ModeParams> for GenerationParams {
    fn from(params: ModeParams) -> Self {
        Self::new(params.max_length, params.temperature)
    }
}

/// A text-generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend/model identifier
    fn name(&self) -> String;

    /// Generate raw text for an already-cleaned prompt
    async fn generate_raw(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError>;

    /// Run one self-supervised update over `samples`, returning the loss
    async fn fine_tune(&self, samples: &[String]) -> Result<f64, ModelError>;

    /// Persist the current weights
    async fn save_weights(&self) -> Result<(), ModelError>;
}

/// Stateful wrapper around a generator that cleans input and output
pub struct ModelAdapter {
    generator: Arc<dyn TextGenerator>,
    sanitize: SanitizeSettings,
    token_window: usize,
}

impl ModelAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &ModelConfig) -> Self {
        Self {
            generator,
            sanitize: SanitizeSettings::from(config),
            token_window: config.token_window,
        }
    }

    pub fn name(&self) -> String {
        self.generator.name()
    }

    /// Generate a cleaned reply, surfacing backend failures
    pub async fn try_generate(&self, prompt: &str, max_length: u32, temperature: f32) -> Result<String, ModelError> {
        let cleaned = clean_input(prompt, self.sanitize.max_prompt_chars);
        if cleaned.is_empty() {
            return Err(ModelError::EmptyPrompt);
        }

        let params = GenerationParams::new(max_length, temperature).with_token_window(self.token_window);
        debug!(
            "Generating with {} (max_length={}, temperature={:.2})",
            self.generator.name(),
            params.max_length,
            params.temperature
        );

        let raw = self.generator.generate_raw(&cleaned, &params).await?;
        let text = clean_output(&raw, &cleaned, &self.sanitize);
        if text.is_empty() {
            return Err(ModelError::Decode("no usable text after cleaning".to_string()));
        }
        Ok(text)
    }

    /// Generate a cleaned reply; failures become an `Error:` diagnostic string
    pub async fn generate(&self, prompt: &str, max_length: u32, temperature: f32) -> String {
        match self.try_generate(prompt, max_length, temperature).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Generation failed: {}", e);
                format!("{} {}", ERROR_MARKER, e)
            }
        }
    }

    pub async fn fine_tune(&self, samples: &[String]) -> Result<f64, ModelError> {
        self.generator.fine_tune(samples).await
    }

    pub async fn save_weights(&self) -> Result<(), ModelError> {
        self.generator.save_weights().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    fn adapter(mock: MockTextGenerator) -> ModelAdapter {
        ModelAdapter::new(Arc::new(mock), &ModelConfig::default())
    }

    #[test]
    fn test_temperature_is_clamped() {
        assert_eq!(GenerationParams::new(10, 3.0).temperature, 1.0);
        assert!(GenerationParams::new(10, 0.0).temperature > 0.0);
        let params = GenerationParams::from(ModeParams { temperature: 0.5, max_length: 80 });
        assert_eq!(params.max_length, 80);
        assert_eq!(params.top_k, TOP_K);
    }

    #[tokio::test]
    async fn test_generate_cleans_prompt_and_output() {
        let mut mock = MockTextGenerator::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_generate_raw()
            .with(eq("اكتب عن البحر"), always())
            .times(1)
            .returning(|prompt, _| Ok(format!("{} البحر واسع. أزرق. عميق. هادئ.", prompt)));

        let model = adapter(mock);
        let text = model.generate("اكتب عن البحر 2024 https://x.y", 120, 0.7).await;
        assert_eq!(text, "البحر واسع. أزرق. عميق.");
    }

    #[tokio::test]
    async fn test_generate_fails_closed() {
        let mut mock = MockTextGenerator::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_generate_raw()
            .returning(|_, _| Err(ModelError::Request("connection refused".to_string())));

        let model = adapter(mock);
        let text = model.generate("مرحبا", 80, 0.5).await;
        assert!(text.starts_with(ERROR_MARKER));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_prompt_never_reaches_backend() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate_raw().never();

        let model = adapter(mock);
        let err = model.try_generate("12345", 80, 0.5).await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyPrompt));
    }

    #[tokio::test]
    async fn test_fine_tune_delegates() {
        let mut mock = MockTextGenerator::new();
        mock.expect_fine_tune().times(1).returning(|samples| Ok(samples.len() as f64));
        mock.expect_save_weights().times(1).returning(|| Ok(()));

        let model = adapter(mock);
        let loss = model.fine_tune(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(loss, 2.0);
        model.save_weights().await.unwrap();
    }
}
