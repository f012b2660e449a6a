//! Conversation context tracking
//!
//! Keeps a short rolling window of exchanges and a best-effort guess of the
//! current topic.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Exchanges kept in the rolling window
pub const MAX_CONTEXT_MESSAGES: usize = 5;

/// Snapshot of the conversation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// (message, response) pairs, oldest first
    pub last_messages: VecDeque<(String, String)>,
    pub current_topic: Option<String>,
    pub user_info: HashMap<String, String>,
}

/// Ordered keyword -> topic table; the first matching entry wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicTable {
    pub entries: Vec<(String, String)>,
}

impl Default for TopicTable {
    fn default() -> Self {
        let entries = [("مشروع", "planning"), ("جدول", "scheduling"), ("تكاليف", "budget")]
            .iter()
            .map(|(k, t)| (k.to_string(), t.to_string()))
            .collect();
        Self { entries }
    }
}

impl TopicTable {
    /// Topic of the first table keyword contained in `message`
    pub fn detect(&self, message: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(keyword, _)| message.contains(keyword.as_str()))
            .map(|(_, topic)| topic.as_str())
    }
}

/// Rolling conversation context for one session
#[derive(Debug, Clone)]
pub struct ContextTracker {
    context: ConversationContext,
    topics: TopicTable,
    capacity: usize,
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new(TopicTable::default())
    }
}

impl ContextTracker {
    pub fn new(topics: TopicTable) -> Self {
        Self {
            context: ConversationContext::default(),
            topics,
            capacity: MAX_CONTEXT_MESSAGES,
        }
    }

    /// Append an exchange (evicting the oldest past capacity) and re-evaluate
    /// the topic. A message without a topic keyword keeps the previous topic.
    pub fn update(&mut self, message: &str, response: &str) {
        self.context
            .last_messages
            .push_back((message.to_string(), response.to_string()));
        while self.context.last_messages.len() > self.capacity {
            self.context.last_messages.pop_front();
        }

        if let Some(topic) = self.topics.detect(message) {
            self.context.current_topic = Some(topic.to_string());
        }
    }

    /// Owned copy of the current context
    pub fn get_context(&self) -> ConversationContext {
        self.context.clone()
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.context.current_topic.as_deref()
    }

    pub fn set_user_info(&mut self, key: &str, value: &str) {
        self.context.user_info.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.context.last_messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context.last_messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.context.last_messages.clear();
        self.context.current_topic = None;
    }
}
