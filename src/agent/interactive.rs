//! Interactive terminal chat
//!
//! A minimal REPL: colored replies per mode, a spinner while a message is
//! processed, and a handful of slash commands.

use anyhow::Result;
use crossterm::{execute, style::{Color, Print, ResetColor, SetForegroundColor}};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::session::{spawn_message, Assistant, DisplaySink};
use crate::types::{Emotion, Mode, ReplyMode, Sender};

/// Terminal-backed display sink
#[derive(Default)]
pub struct TerminalSink {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for TerminalSink {
    fn display(&self, text: &str, sender: Sender, mode: ReplyMode, emotion: Emotion) {
        let color = match sender {
            Sender::Assistant => mode_color(mode),
            Sender::User => Color::White,
            Sender::System => Color::DarkGrey,
        };
        print_colored(&format!("{} ", sender.label()), color);
        if sender == Sender::Assistant {
            print_colored(&format!("[{}] ", mode), Color::DarkGrey);
        }
        println!("{}{}", text, emotion_marker(emotion));
        println!();
    }

    fn show_loading(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.dim} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("ماني يفكر...");
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn hide_loading(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn mode_color(mode: ReplyMode) -> Color {
    match mode {
        ReplyMode::Direct => Color::Green,
        ReplyMode::Stable => Color::Blue,
        ReplyMode::Creative => Color::Yellow,
        ReplyMode::Error => Color::Red,
    }
}

fn emotion_marker(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Happy => " 😊",
        Emotion::Sad => " 🫂",
        Emotion::Neutral => "",
    }
}

/// Print colored output
fn print_colored(text: &str, color: Color) {
    let _ = execute!(io::stdout(), SetForegroundColor(color), Print(text), ResetColor);
}

fn print_dim(text: &str) {
    print_colored(text, Color::DarkGrey);
    println!();
}

fn print_help() {
    println!();
    print_dim("  /mode <direct|stable|creative>  Change generation mode");
    print_dim("  /context                        Show recent context");
    print_dim("  /clear                          Forget the recent context");
    print_dim("  /stats                          Show learning statistics");
    print_dim("  /exit                           Leave the chat");
    println!();
}

/// Run the interactive chat loop until EOF or /exit
pub async fn run_interactive(assistant: Arc<Assistant>) -> Result<()> {
    let sink: Arc<dyn DisplaySink> = Arc::new(TerminalSink::new());

    sink.display(assistant.greeting(), Sender::Assistant, assistant.active_mode().await.into(), Emotion::Happy);
    print_dim(&format!("  model: {}  ·  /help for commands", assistant.model_name()));
    println!();

    let mut rl = rustyline::DefaultEditor::new()?;

    loop {
        match rl.readline("\x1b[32m❯\x1b[0m ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match input {
                    "/exit" | "/quit" => break,
                    "/help" => {
                        print_help();
                        continue;
                    }
                    "/context" => {
                        let context = assistant.context().await;
                        for (message, response) in &context.last_messages {
                            print_dim(&format!("  {} > {}", message, response));
                        }
                        if let Some(topic) = context.current_topic {
                            print_dim(&format!("  topic: {}", topic));
                        }
                        continue;
                    }
                    "/clear" => {
                        assistant.clear_context().await;
                        sink.display("تم مسح سياق المحادثة", Sender::System, ReplyMode::Stable, Emotion::Neutral);
                        continue;
                    }
                    "/stats" => {
                        match assistant.learning_stats().await {
                            Ok(report) => print_report(&report),
                            Err(e) => print_colored(&format!("✗ {}\n", e), Color::Red),
                        }
                        continue;
                    }
                    _ => {}
                }

                if let Some(name) = input.strip_prefix("/mode") {
                    match Mode::parse(name) {
                        Some(mode) => {
                            assistant.set_mode(mode).await;
                            sink.display(&format!("mode: {}", mode), Sender::System, mode.into(), Emotion::Neutral);
                        }
                        None => print_dim("  usage: /mode <direct|stable|creative>"),
                    }
                    continue;
                }

                let handle = spawn_message(assistant.clone(), input.to_string(), sink.clone());
                if let Err(e) = handle.await {
                    print_colored(&format!("✗ {}\n", e), Color::Red);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                print_colored(&format!("Error: {}\n", err), Color::Red);
                break;
            }
        }
    }

    print_colored("مع السلامة! 👋\n", Color::Green);
    Ok(())
}

/// Print a learning report
pub fn print_report(report: &crate::learning::LearningReport) {
    println!();
    println!("  Model:                 {}", report.model);
    println!("  Learning:              {}", if report.enabled { "enabled" } else { "disabled" });
    println!("  Interactions:          {}", report.stats.total_interactions);
    println!("  Valuable interactions: {}", report.stats.valuable_interactions);
    println!("  Knowledge items:       {}", report.stats.knowledge_items);
    if !report.stats.top_patterns.is_empty() {
        println!("  Top patterns:");
        for pattern in &report.stats.top_patterns {
            println!("    {:<18} {}", pattern.name, pattern.count);
        }
    }
    println!(
        "  Metrics:               accuracy={:.3} response_time={:.2} adaptability={:.2} cycles={}",
        report.metrics.accuracy,
        report.metrics.response_time,
        report.metrics.adaptability,
        report.metrics.improvement_cycles
    );
    println!();
}
