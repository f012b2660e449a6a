//! Mani - Arabic Conversational Assistant Library
//!
//! A single-user assistant with:
//! - Fixed commands and canned answers matched before any model call
//! - Generative fallback through a hosted text-generation model
//! - Short-term conversation context and topic tracking
//! - A SQLite learning log with pattern detection and feedback scoring
//!
//! # Example
//!
//! ```ignore
//! use mani::{Assistant, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let assistant = Assistant::open(&config).await?;
//!     let reply = assistant.handle("ما اسمك؟").await;
//!     println!("{}", reply.text);
//!     assistant.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod types;
pub mod error;
pub mod config;
pub mod security;
pub mod knowledge;
pub mod model;
pub mod learning; // Pattern detection and feedback loop
pub mod agent;
pub mod cli;

// Feature modules
pub mod doctor;

pub use agent::{
    spawn_message,
    Assistant,
    ContextTracker,
    DisplaySink,
    ResponseDispatcher,
    TerminalSink,
};

pub use config::Config;

pub use error::{AssistantError, ModelError, StorageError};

pub use knowledge::KnowledgeStore;

pub use learning::{LearningEngine, PatternDetector};

pub use model::{HuggingFaceGenerator, ModelAdapter, TextGenerator};

pub use security::{
    set_hf_token,
    get_hf_token,
    delete_hf_token,
    has_hf_token,
};

pub use types::{Emotion, Mode, Reply, ReplyMode, ReplySource, Sender};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Arabic Conversational Assistant", NAME, VERSION)
}
