//! Shared types used across modules
//!
//! This module contains types that are used by the dispatcher, the learning
//! loop and the front-end to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Generation mode, selected by command and applied to generative calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Direct,
    Stable,
    Creative,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Direct => "direct",
            Mode::Stable => "stable",
            Mode::Creative => "creative",
        }
    }

    /// Parse from a mode name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "fast" => Some(Mode::Direct),
            "stable" | "precise" => Some(Mode::Stable),
            "creative" => Some(Mode::Creative),
            _ => None,
        }
    }

    pub fn all() -> &'static [Mode] {
        &[Mode::Direct, Mode::Stable, Mode::Creative]
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mode label attached to a reply; `Error` marks a failed or rejected message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    Direct,
    Stable,
    Creative,
    Error,
}

impl ReplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyMode::Direct => "direct",
            ReplyMode::Stable => "stable",
            ReplyMode::Creative => "creative",
            ReplyMode::Error => "error",
        }
    }
}

impl From<Mode> for ReplyMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Direct => ReplyMode::Direct,
            Mode::Stable => ReplyMode::Stable,
            Mode::Creative => ReplyMode::Creative,
        }
    }
}

impl std::fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse emotion label detected from text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which dispatch strategy produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Validation,
    Command,
    Canned,
    CommonQuestion,
    Generated,
    Failure,
}

/// Result of processing one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub mode: ReplyMode,
    pub emotion: Emotion,
    pub source: ReplySource,
}

impl Reply {
    pub fn new(text: impl Into<String>, mode: impl Into<ReplyMode>, emotion: Emotion, source: ReplySource) -> Self {
        Self {
            text: text.into(),
            mode: mode.into(),
            emotion,
            source,
        }
    }

    /// Error reply with neutral emotion
    pub fn error(text: impl Into<String>, source: ReplySource) -> Self {
        Self::new(text, ReplyMode::Error, Emotion::Neutral, source)
    }

    pub fn is_error(&self) -> bool {
        self.mode == ReplyMode::Error
    }

    /// (text, mode, emotion) view of the reply
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.text, self.mode.as_str(), self.emotion.as_str())
    }
}

/// Who a displayed message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    /// Label shown next to the message
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "أنت",
            Sender::Assistant => "ماني",
            Sender::System => "النظام",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("Direct"), Some(Mode::Direct));
        assert_eq!(Mode::parse(" creative "), Some(Mode::Creative));
        assert_eq!(Mode::parse("loud"), None);
    }

    #[test]
    fn test_reply_tuple() {
        let reply = Reply::new("hi", Mode::Stable, Emotion::Happy, ReplySource::Canned);
        assert_eq!(reply.as_tuple(), ("hi", "stable", "happy"));
        assert!(!reply.is_error());
        assert!(Reply::error("x", ReplySource::Validation).is_error());
    }
}
