//! CLI interface for mani

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::Assistant;
use crate::config::Config;
use crate::knowledge::KnowledgeStore;
use crate::types::Sender;

#[derive(Parser)]
#[command(name = "mani")]
#[command(about = "Arabic conversational assistant with canned answers, generative fallback and a learning log", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default when no command given)
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// Message text
        text: String,
    },
    /// Show learning statistics
    Stats,
    /// Run diagnostics and the answer self-test
    Doctor,
    /// Configure the assistant
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Store the Hugging Face API token
        #[arg(long)]
        set_hf_token: Option<String>,
        /// Remove the stored Hugging Face API token
        #[arg(long)]
        delete_hf_token: bool,
        /// Set the mode new sessions start in (direct, stable, creative)
        #[arg(long)]
        set_mode: Option<String>,
    },
    /// Remember a personal fact
    Remember {
        key: String,
        value: String,
    },
    /// Recall a personal fact
    Recall {
        key: String,
    },
    /// Add a stored question with a fixed answer
    Teach {
        question: String,
        answer: String,
    },
    /// List learned knowledge
    Knowledge,
    /// Forget a learned knowledge topic
    Forget {
        topic: String,
    },
    /// Show recent conversation history
    History {
        /// Maximum exchanges to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Copy the knowledge database to a file
    Backup {
        /// Destination path (must not exist)
        path: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let assistant = Arc::new(Assistant::open(&config).await?);
            crate::agent::run_interactive(assistant.clone()).await?;
            if let Ok(assistant) = Arc::try_unwrap(assistant) {
                assistant.shutdown().await;
            }
        }
        Commands::Ask { text } => {
            let config = Config::load()?;
            let assistant = Assistant::open(&config).await?;
            let reply = assistant.handle(&text).await;
            println!("{}", reply.text);
            assistant.shutdown().await;
        }
        Commands::Stats => {
            let config = Config::load()?;
            let assistant = Assistant::open(&config).await?;
            let report = assistant.learning_stats().await?;
            crate::agent::print_report(&report);
            assistant.shutdown().await;
        }
        Commands::Doctor => {
            let config = Config::load()?;
            let assistant = Assistant::open(&config).await?;
            let healthy = crate::doctor::run_diagnostics(&assistant, &config).await?;
            assistant.shutdown().await;
            if !healthy {
                std::process::exit(1);
            }
        }
        Commands::Config { show, set_hf_token, delete_hf_token, set_mode } => {
            if let Some(token) = set_hf_token {
                crate::security::set_hf_token(&token)?;
                println!("Hugging Face token stored securely.");
            } else if delete_hf_token {
                crate::security::delete_hf_token()?;
                println!("Hugging Face token removed.");
            } else if let Some(mode) = set_mode {
                crate::config::set_initial_mode(&mode)?;
            } else if show {
                crate::config::show_config()?;
            } else {
                println!("Use --show to view configuration, --set-hf-token to store a token,");
                println!("or --set-mode to change the starting mode.");
            }
        }
        Commands::Remember { key, value } => {
            let store = open_store().await?;
            store.set_personal_info(&key, &value).await?;
            println!("Remembered {}.", key);
        }
        Commands::Recall { key } => {
            let store = open_store().await?;
            match store.get_personal_info(&key).await? {
                Some(value) => println!("{}", value),
                None => println!("Nothing remembered for '{}'.", key),
            }
        }
        Commands::Teach { question, answer } => {
            let store = open_store().await?;
            if store.add_common_question(&question, &answer).await? {
                println!("Added question: {}", question);
            } else {
                println!("Question already known: {}", question);
            }
        }
        Commands::Knowledge => {
            let store = open_store().await?;
            let items = store.list_knowledge().await?;
            if items.is_empty() {
                println!("Nothing learned yet.");
            }
            for item in items {
                println!("• {} ({:.2})", item.topic, item.confidence);
                println!("    {}", crate::model::sanitize::truncate_chars(&item.details, 120));
            }
        }
        Commands::Forget { topic } => {
            let store = open_store().await?;
            if store.forget_knowledge(&topic).await? {
                println!("Forgot '{}'.", topic);
            } else {
                println!("No knowledge stored for '{}'.", topic);
            }
        }
        Commands::History { limit } => {
            let store = open_store().await?;
            let history = store.conversation_history(limit).await?;
            if history.is_empty() {
                println!("No conversations yet.");
            }
            for exchange in history {
                println!("[{}]", exchange.timestamp.format("%Y-%m-%d %H:%M"));
                println!("  {}: {}", Sender::User.label(), exchange.user_input);
                println!("  {}: {}", Sender::Assistant.label(), exchange.ai_response);
            }
        }
        Commands::Backup { path } => {
            if path.exists() {
                anyhow::bail!("Backup target {} already exists", path.display());
            }
            let store = open_store().await?;
            store
                .backup(&path)
                .await
                .with_context(|| format!("Failed to back up to {}", path.display()))?;
            println!("Backup written to {}", path.display());
        }
    }

    Ok(())
}

/// Open the configured knowledge store without starting a session
async fn open_store() -> Result<KnowledgeStore> {
    let config = Config::load()?;
    let path = config.storage.resolve()?;
    KnowledgeStore::open(&path)
        .await
        .with_context(|| format!("Failed to open knowledge store at {}", path.display()))
}
