//! Hosted text-generation backend (Hugging Face inference API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{GenerationParams, TextGenerator};
use crate::config::ModelConfig;
use crate::error::ModelError;

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: RequestParameters,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    repetition_penalty: f32,
    do_sample: bool,
    return_full_text: bool,
    truncate: usize,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Text generator backed by a hosted inference endpoint
pub struct HuggingFaceGenerator {
    client: Arc<Client>,
    endpoint: String,
    model: String,
    token: Option<String>,
}

impl HuggingFaceGenerator {
    pub fn new(config: &ModelConfig, token: Option<String>) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            token,
        })
    }

    /// Build from config, reading the API token from the environment or keyring
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        Self::new(config, crate::security::get_hf_token().ok())
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self) -> String {
        format!("{}/{}", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn name(&self) -> String {
        self.model.clone()
    }

    async fn generate_raw(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError> {
        let request = GenerationRequest {
            inputs: prompt,
            parameters: RequestParameters {
                max_new_tokens: params.max_length,
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                repetition_penalty: params.repetition_penalty,
                do_sample: true,
                return_full_text: true,
                truncate: params.token_window,
            },
            options: RequestOptions { wait_for_model: true },
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let body = response.text().await?;
        debug!("Generation response: {} bytes", body.len());
        parse_generation(&body)
    }

    async fn fine_tune(&self, _samples: &[String]) -> Result<f64, ModelError> {
        Err(ModelError::Unsupported("fine-tuning"))
    }

    async fn save_weights(&self) -> Result<(), ModelError> {
        Err(ModelError::Unsupported("saving weights"))
    }
}

/// Accept either `[{"generated_text": ...}]` or a bare object
fn parse_generation(body: &str) -> Result<String, ModelError> {
    if let Ok(mut items) = serde_json::from_str::<Vec<GeneratedText>>(body) {
        if items.is_empty() {
            return Err(ModelError::Decode("empty generation list".to_string()));
        }
        return Ok(items.swap_remove(0).generated_text);
    }

    serde_json::from_str::<GeneratedText>(body)
        .map(|item| item.generated_text)
        .map_err(|e| ModelError::Decode(format!("{} (body: {})", e, super::sanitize::truncate_chars(body, 200))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generation_list() {
        let text = parse_generation(r#"[{"generated_text": "مرحبا بك"}]"#).unwrap();
        assert_eq!(text, "مرحبا بك");
    }

    #[test]
    fn test_parse_generation_object() {
        assert_eq!(parse_generation(r#"{"generated_text": "x"}"#).unwrap(), "x");
    }

    #[test]
    fn test_parse_generation_errors() {
        assert!(matches!(parse_generation("[]"), Err(ModelError::Decode(_))));
        assert!(matches!(parse_generation(r#"{"error": "loading"}"#), Err(ModelError::Decode(_))));
    }

    #[test]
    fn test_url_joins_endpoint_and_model() {
        let config = ModelConfig {
            endpoint: "http://localhost:8080/models/".to_string(),
            ..ModelConfig::default()
        };
        let generator = HuggingFaceGenerator::new(&config, None).unwrap();
        assert_eq!(generator.url(), "http://localhost:8080/models/aubmindlab/aragpt2-base");
        assert!(!generator.has_token());
    }

    #[tokio::test]
    async fn test_hosted_backend_cannot_fine_tune() {
        let generator = HuggingFaceGenerator::new(&ModelConfig::default(), None).unwrap();
        let err = generator.fine_tune(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, ModelError::Unsupported(_)));
    }
}
