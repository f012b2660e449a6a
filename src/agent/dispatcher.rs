//! Response dispatcher
//!
//! Picks a strategy for each message, in priority order: validation,
//! built-in command, canned answer, stored common question, generation.
//! It never returns an error; failures become error replies.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ModesConfig;
use crate::error::ModelError;
use crate::knowledge::KnowledgeStore;
use crate::model::{ModelAdapter, ERROR_MARKER};
use crate::types::{Emotion, Mode, Reply, ReplySource};

/// Reply to an empty or whitespace-only message
pub const VALIDATION_MESSAGE: &str = "الرجاء إدخال رسالة صحيحة";

pub const HELP_TEXT: &str = "الأوامر المتاحة:
- وضع سريع: ردود سريعة
- وضع دقيق: ردود مفصلة
- وضع إبداعي: ردود إبداعية
- مساعدة: عرض هذه القائمة";

/// (phrase, action, reply)
const COMMAND_TABLE: &[(&str, CommandAction, &str)] = &[
    ("وضع سريع", CommandAction::SetMode(Mode::Direct), "تم تفعيل الوضع السريع ⚡"),
    ("وضع دقيق", CommandAction::SetMode(Mode::Stable), "تم تفعيل الوضع الدقيق 🔍"),
    ("وضع إبداعي", CommandAction::SetMode(Mode::Creative), "تم تفعيل الوضع الإبداعي 🎨"),
    ("مساعدة", CommandAction::Help, HELP_TEXT),
];

/// (pattern, text, mode, emotion)
const CANNED_TABLE: &[(&str, &str, Mode, Emotion)] = &[
    ("اسمك|ما اسمك", "أنا ماني، مساعدك الذكي!", Mode::Stable, Emotion::Happy),
    ("كيف حالك|أخبارك", "أنا بخير دائمًا، شكرًا لسؤالك!", Mode::Stable, Emotion::Happy),
    ("مساعدة|مساعده", "يمكنك طرح أي سؤال، سأحاول مساعدتك!", Mode::Creative, Emotion::Neutral),
    ("شكرًا|شكراً|متشكر", "العفو! دائمًا تحت الخدمة.", Mode::Direct, Emotion::Happy),
];

const POSITIVE_WORDS: &[&str] = &["ممتاز", "شكرًا", "شكراً", "سعيد"];
const NEGATIVE_WORDS: &[&str] = &["مشكلة", "خطأ", "حزين"];

static DEFAULT_CANNED: Lazy<Vec<CannedResponse>> = Lazy::new(|| {
    CANNED_TABLE
        .iter()
        .map(|(pattern, text, mode, emotion)| {
            CannedResponse::new(pattern, text, *mode, *emotion).expect("valid canned response pattern")
        })
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    SetMode(Mode),
    Help,
}

#[derive(Debug, Clone)]
pub struct Command {
    /// Lowercase phrase matched as a substring
    pub phrase: String,
    pub action: CommandAction,
    pub reply: String,
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub pattern: Regex,
    pub text: String,
    pub mode: Mode,
    pub emotion: Emotion,
}

impl CannedResponse {
    pub fn new(pattern: &str, text: &str, mode: Mode, emotion: Emotion) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            text: text.to_string(),
            mode,
            emotion,
        })
    }
}

/// Keyword lists for coarse emotion detection
#[derive(Debug, Clone)]
pub struct EmotionLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for EmotionLexicon {
    fn default() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().map(|w| w.to_string()).collect(),
            negative: NEGATIVE_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl EmotionLexicon {
    /// Positive wins over negative; neutral when neither matches
    pub fn detect(&self, text: &str) -> Emotion {
        if self.positive.iter().any(|w| text.contains(w.as_str())) {
            Emotion::Happy
        } else if self.negative.iter().any(|w| text.contains(w.as_str())) {
            Emotion::Sad
        } else {
            Emotion::Neutral
        }
    }
}

/// Fixed lookup tables, built once at startup
#[derive(Debug, Clone)]
pub struct DispatchTables {
    pub commands: Vec<Command>,
    pub canned: Vec<CannedResponse>,
    pub emotions: EmotionLexicon,
}

impl Default for DispatchTables {
    fn default() -> Self {
        let commands = COMMAND_TABLE
            .iter()
            .map(|(phrase, action, reply)| Command {
                phrase: phrase.to_lowercase(),
                action: *action,
                reply: reply.to_string(),
            })
            .collect();

        Self {
            commands,
            canned: DEFAULT_CANNED.clone(),
            emotions: EmotionLexicon::default(),
        }
    }
}

impl DispatchTables {
    /// First command whose phrase occurs in the lowercased message
    pub fn find_command(&self, lowered: &str) -> Option<&Command> {
        self.commands
            .iter()
            .find(|c| !c.phrase.is_empty() && lowered.contains(c.phrase.as_str()))
    }

    /// First canned entry (table order) whose pattern matches
    pub fn find_canned(&self, lowered: &str) -> Option<&CannedResponse> {
        self.canned.iter().find(|c| c.pattern.is_match(lowered))
    }
}

/// Orchestrates one message into one reply
pub struct ResponseDispatcher {
    tables: DispatchTables,
    modes: ModesConfig,
    active_mode: RwLock<Mode>,
    model: Arc<ModelAdapter>,
    store: Option<Arc<KnowledgeStore>>,
}

impl ResponseDispatcher {
    pub fn new(model: Arc<ModelAdapter>, modes: ModesConfig) -> Self {
        let initial = modes.initial;
        Self {
            tables: DispatchTables::default(),
            modes,
            active_mode: RwLock::new(initial),
            model,
            store: None,
        }
    }

    /// Also answer from the stored common questions
    pub fn with_store(mut self, store: Arc<KnowledgeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn active_mode(&self) -> Mode {
        *self.active_mode.read().await
    }

    pub async fn set_mode(&self, mode: Mode) {
        *self.active_mode.write().await = mode;
        info!("Active mode set to {}", mode);
    }

    pub fn detect_emotion(&self, text: &str) -> Emotion {
        self.tables.emotions.detect(text)
    }

    /// Process a message into a reply
    pub async fn process(&self, message: &str) -> Reply {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Reply::error(VALIDATION_MESSAGE, ReplySource::Validation);
        }

        let lowered = message.to_lowercase();

        if let Some(command) = self.tables.find_command(&lowered) {
            debug!("Command matched: {}", command.phrase);
            return self.run_command(command).await;
        }

        if let Some(canned) = self.tables.find_canned(&lowered) {
            debug!("Canned response matched: {}", canned.pattern.as_str());
            return Reply::new(canned.text.clone(), canned.mode, canned.emotion, ReplySource::Canned);
        }

        let mode = self.active_mode().await;

        if let Some(reply) = self.answer_common_question(trimmed, mode).await {
            return reply;
        }

        self.generate(message, mode).await
    }

    async fn run_command(&self, command: &Command) -> Reply {
        match command.action {
            CommandAction::SetMode(mode) => {
                self.set_mode(mode).await;
                Reply::new(command.reply.clone(), mode, Emotion::Neutral, ReplySource::Command)
            }
            CommandAction::Help => {
                let mode = self.active_mode().await;
                Reply::new(command.reply.clone(), mode, Emotion::Neutral, ReplySource::Command)
            }
        }
    }

    async fn answer_common_question(&self, message: &str, mode: Mode) -> Option<Reply> {
        let store = self.store.as_ref()?;

        match store.find_common_question(message).await {
            Ok(Some(question)) => {
                if let Err(e) = store.record_question_usage(&question.question).await {
                    warn!("Failed to record common question usage: {}", e);
                }
                let emotion = self.detect_emotion(&question.answer);
                Some(Reply::new(question.answer, mode, emotion, ReplySource::CommonQuestion))
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Common question lookup failed: {}", e);
                None
            }
        }
    }

    async fn generate(&self, message: &str, mode: Mode) -> Reply {
        let params = self.modes.params(mode);

        match self
            .model
            .try_generate(message, params.max_length, params.temperature)
            .await
        {
            Ok(text) => {
                let emotion = self.detect_emotion(&text);
                Reply::new(text, mode, emotion, ReplySource::Generated)
            }
            // Nothing left once URLs and digits are stripped
            Err(ModelError::EmptyPrompt) => Reply::error(VALIDATION_MESSAGE, ReplySource::Validation),
            Err(e) => {
                warn!("Generation failed in {} mode: {}", mode, e);
                Reply::error(format!("{} {}", ERROR_MARKER, e), ReplySource::Failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::model::{GenerationParams, MockTextGenerator};
    use crate::types::ReplyMode;

    fn dispatcher(mock: MockTextGenerator) -> ResponseDispatcher {
        let model = Arc::new(ModelAdapter::new(Arc::new(mock), &ModelConfig::default()));
        ResponseDispatcher::new(model, ModesConfig::default())
    }

    fn silent_model() -> MockTextGenerator {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate_raw().never();
        mock
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let dispatcher = dispatcher(silent_model());
        for message in ["", "   ", "\n\t"] {
            let reply = dispatcher.process(message).await;
            assert_eq!(reply.as_tuple(), (VALIDATION_MESSAGE, "error", "neutral"));
            assert_eq!(reply.source, ReplySource::Validation);
        }
    }

    #[tokio::test]
    async fn test_digits_and_links_only_are_rejected() {
        let dispatcher = dispatcher(silent_model());
        for message in ["2024", "https://example.com 42"] {
            let reply = dispatcher.process(message).await;
            assert_eq!(reply.as_tuple(), (VALIDATION_MESSAGE, "error", "neutral"));
            assert_eq!(reply.source, ReplySource::Validation);
        }
    }

    #[tokio::test]
    async fn test_canned_name_answer() {
        let dispatcher = dispatcher(silent_model());
        let reply = dispatcher.process("ما اسمك").await;
        assert_eq!(reply.as_tuple(), ("أنا ماني، مساعدك الذكي!", "stable", "happy"));
        assert_eq!(reply.source, ReplySource::Canned);
    }

    #[tokio::test]
    async fn test_help_command_wins_over_canned() {
        let dispatcher = dispatcher(silent_model());
        let reply = dispatcher.process("أحتاج مساعدة").await;
        assert_eq!(reply.text, HELP_TEXT);
        assert_eq!(reply.mode, ReplyMode::Stable);
        assert_eq!(reply.source, ReplySource::Command);
    }

    #[tokio::test]
    async fn test_mode_command_changes_generation_params() {
        let mut mock = MockTextGenerator::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_generate_raw()
            .withf(|_, params: &GenerationParams| {
                params.max_length == 80 && (params.temperature - 0.5).abs() < 1e-6
            })
            .times(1)
            .returning(|_, _| Ok("النتيجة ممتاز جداً".to_string()));

        let dispatcher = dispatcher(mock);
        let reply = dispatcher.process("وضع سريع من فضلك").await;
        assert_eq!(reply.as_tuple(), ("تم تفعيل الوضع السريع ⚡", "direct", "neutral"));
        assert_eq!(dispatcher.active_mode().await, Mode::Direct);

        let reply = dispatcher.process("اكتب قصيدة قصيرة").await;
        assert_eq!(reply.as_tuple(), ("النتيجة ممتاز جداً", "direct", "happy"));
        assert_eq!(reply.source, ReplySource::Generated);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_error_reply() {
        let mut mock = MockTextGenerator::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_generate_raw()
            .returning(|_, _| Err(ModelError::Status { status: 503, body: "loading".to_string() }));

        let dispatcher = dispatcher(mock);
        let reply = dispatcher.process("اكتب قصيدة قصيرة").await;
        assert!(reply.is_error());
        assert!(reply.text.starts_with(ERROR_MARKER));
        assert_eq!(reply.source, ReplySource::Failure);
        assert_eq!(dispatcher.active_mode().await, Mode::Stable);
    }

    #[tokio::test]
    async fn test_stored_common_question_uses_active_mode() {
        let store = Arc::new(KnowledgeStore::in_memory().unwrap());
        let dispatcher = dispatcher(silent_model()).with_store(store.clone());
        dispatcher.set_mode(Mode::Creative).await;

        let reply = dispatcher.process("من أنا؟").await;
        assert_eq!(reply.text, "أنت المستخدم الذي أتفاعل معه وأتعلم منه يومياً");
        assert_eq!(reply.mode, ReplyMode::Creative);
        assert_eq!(reply.source, ReplySource::CommonQuestion);

        let questions = store.common_questions().await.unwrap();
        assert_eq!(questions[0].usage_count, 1);
    }

    #[test]
    fn test_emotion_positive_wins() {
        let lexicon = EmotionLexicon::default();
        assert_eq!(lexicon.detect("ممتاز رغم المشكلة"), Emotion::Happy);
        assert_eq!(lexicon.detect("عندي مشكلة"), Emotion::Sad);
        assert_eq!(lexicon.detect("السماء زرقاء"), Emotion::Neutral);
    }
}
