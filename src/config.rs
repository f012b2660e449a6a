//! Configuration management
//!
//! Manages the model backend, generation modes, learning constants and the
//! knowledge store location. Loaded once at startup and passed by reference.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::Mode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Text-generation backend settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Generation parameter bundles per mode
    #[serde(default)]
    pub modes: ModesConfig,
    /// Learning loop constants
    #[serde(default)]
    pub learning: LearningConfig,
    /// Knowledge store settings
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier on the inference endpoint
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Base URL of the text-generation endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// HTTP timeout for one generation request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Prompt character budget after cleaning
    #[serde(default = "default_char_budget")]
    pub max_prompt_chars: usize,
    /// Output character budget after cleaning
    #[serde(default = "default_char_budget")]
    pub max_output_chars: usize,
    /// Token window the backend truncates prompts to
    #[serde(default = "default_token_window")]
    pub token_window: usize,
    /// Sentences kept from a generated reply
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    /// Promotional/contact phrases that end a generated reply
    #[serde(default = "default_stop_phrases")]
    pub stop_phrases: Vec<String>,
}

fn default_model_name() -> String {
    "aubmindlab/aragpt2-base".to_string()
}

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_char_budget() -> usize {
    500
}

fn default_token_window() -> usize {
    512
}

fn default_max_sentences() -> usize {
    3
}

fn default_stop_phrases() -> Vec<String> {
    [
        "اتصلوا بنا",
        "صادم:",
        "الربح من الإنترنت",
        "فيسبوك",
        "واتساب",
        "البريد الإلكتروني",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            max_prompt_chars: default_char_budget(),
            max_output_chars: default_char_budget(),
            token_window: default_token_window(),
            max_sentences: default_max_sentences(),
            stop_phrases: default_stop_phrases(),
        }
    }
}

/// Temperature and length used for one mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeParams {
    pub temperature: f32,
    pub max_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModesConfig {
    /// Mode active when a session starts
    #[serde(default = "default_initial_mode")]
    pub initial: Mode,
    #[serde(default = "default_direct")]
    pub direct: ModeParams,
    #[serde(default = "default_stable")]
    pub stable: ModeParams,
    #[serde(default = "default_creative")]
    pub creative: ModeParams,
}

fn default_initial_mode() -> Mode {
    Mode::Stable
}

fn default_direct() -> ModeParams {
    ModeParams { temperature: 0.5, max_length: 80 }
}

fn default_stable() -> ModeParams {
    ModeParams { temperature: 0.7, max_length: 120 }
}

fn default_creative() -> ModeParams {
    ModeParams { temperature: 0.9, max_length: 200 }
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_mode(),
            direct: default_direct(),
            stable: default_stable(),
            creative: default_creative(),
        }
    }
}

impl ModesConfig {
    /// Parameter bundle for a mode
    pub fn params(&self, mode: Mode) -> ModeParams {
        match mode {
            Mode::Direct => self.direct,
            Mode::Stable => self.stable,
            Mode::Creative => self.creative,
        }
    }
}

/// Heuristic constants of the learning loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Disable analysis and fine-tuning (interactions are still logged)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Input must have more words than this to be valuable
    #[serde(default = "default_valuable_min_words")]
    pub valuable_min_words: usize,
    /// Responses with fewer words are judged incorrect
    #[serde(default = "default_min_response_words")]
    pub min_response_words: usize,
    /// Shared input/response words needed for a correct judgement
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
    #[serde(default = "default_correct_base")]
    pub correct_base: f64,
    #[serde(default = "default_incorrect_base")]
    pub incorrect_base: f64,
    /// Divisor applied to the response word count for the length bonus
    #[serde(default = "default_length_normalizer")]
    pub length_normalizer: f64,
    #[serde(default = "default_length_bonus_cap")]
    pub length_bonus_cap: f64,
    #[serde(default = "default_technical_bonus")]
    pub technical_bonus: f64,
    /// Interactions fed to one fine-tuning step
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Words kept when no better topic is found
    #[serde(default = "default_topic_fallback_words")]
    pub topic_fallback_words: usize,
    /// "I don't know" phrases that mark a response incorrect
    #[serde(default = "default_hedging_phrases")]
    pub hedging_phrases: Vec<String>,
    /// Words that introduce a topic ("about", "regarding")
    #[serde(default = "default_topic_connectors")]
    pub topic_connectors: Vec<String>,
    /// Pattern categories that always request a fine-tuning step
    #[serde(default = "default_improvement_triggers")]
    pub improvement_triggers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_valuable_min_words() -> usize {
    5
}

fn default_min_response_words() -> usize {
    3
}

fn default_min_overlap() -> usize {
    2
}

fn default_correct_base() -> f64 {
    0.7
}

fn default_incorrect_base() -> f64 {
    0.3
}

fn default_length_normalizer() -> f64 {
    50.0
}

fn default_length_bonus_cap() -> f64 {
    0.2
}

fn default_technical_bonus() -> f64 {
    0.1
}

fn default_recent_limit() -> usize {
    10
}

fn default_topic_fallback_words() -> usize {
    5
}

fn default_hedging_phrases() -> Vec<String> {
    ["لا أعرف", "غير متأكد", "عذراً", "لا يمكنني", "i don't know", "not sure"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_topic_connectors() -> Vec<String> {
    ["عن", "بخصوص", "حول", "يعني"].iter().map(|s| s.to_string()).collect()
}

fn default_improvement_triggers() -> Vec<String> {
    vec!["error".to_string(), "misunderstanding".to_string()]
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            valuable_min_words: default_valuable_min_words(),
            min_response_words: default_min_response_words(),
            min_overlap: default_min_overlap(),
            correct_base: default_correct_base(),
            incorrect_base: default_incorrect_base(),
            length_normalizer: default_length_normalizer(),
            length_bonus_cap: default_length_bonus_cap(),
            technical_bonus: default_technical_bonus(),
            recent_limit: default_recent_limit(),
            topic_fallback_words: default_topic_fallback_words(),
            hedging_phrases: default_hedging_phrases(),
            topic_connectors: default_topic_connectors(),
            improvement_triggers: default_improvement_triggers(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path (defaults to the data directory)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database path
    pub fn resolve(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("mani.db")),
        }
    }
}

impl Config {
    /// Load configuration from file, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "mani", "mani")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "mani", "mani")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Model");
    println!("  name:      {}", config.model.name);
    println!("  endpoint:  {}", config.model.endpoint);
    println!("  token set: {}", if crate::security::has_hf_token() { "yes" } else { "no" });

    println!("\nModes (initial: {})", config.modes.initial);
    for mode in Mode::all() {
        let params = config.modes.params(*mode);
        println!("  {:<9} temperature={:.1} max_length={}", mode, params.temperature, params.max_length);
    }

    println!("\nLearning: {}", if config.learning.enabled { "enabled" } else { "disabled" });
    println!("Database: {}", config.storage.resolve()?.display());
    println!("Config:   {}", config_path()?.display());

    Ok(())
}

/// Change the mode a new session starts in
pub fn set_initial_mode(name: &str) -> Result<()> {
    let mode = Mode::parse(name)
        .with_context(|| format!("Unknown mode '{}', expected direct, stable or creative", name))?;
    let mut config = Config::load()?;
    config.modes.initial = mode;
    config.save()?;
    println!("Initial mode set to {}", mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_table_defaults() {
        let modes = ModesConfig::default();
        assert_eq!(modes.initial, Mode::Stable);
        assert_eq!(modes.params(Mode::Direct), ModeParams { temperature: 0.5, max_length: 80 });
        assert_eq!(modes.params(Mode::Stable), ModeParams { temperature: 0.7, max_length: 120 });
        assert_eq!(modes.params(Mode::Creative), ModeParams { temperature: 0.9, max_length: 200 });
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [modes]
            initial = "creative"

            [learning]
            recent_limit = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.modes.initial, Mode::Creative);
        assert_eq!(config.modes.direct.max_length, 80);
        assert_eq!(config.learning.recent_limit, 4);
        assert_eq!(config.learning.valuable_min_words, 5);
        assert_eq!(config.model.max_prompt_chars, 500);
        assert_eq!(config.model.stop_phrases.len(), 6);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.model.name, config.model.name);
        assert_eq!(parsed.learning.hedging_phrases, config.learning.hedging_phrases);
    }

    #[test]
    fn test_explicit_database_path() {
        let storage = StorageConfig { database_path: Some(PathBuf::from("/tmp/x.db")) };
        assert_eq!(storage.resolve().unwrap(), PathBuf::from("/tmp/x.db"));
    }
}
