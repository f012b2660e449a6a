//! SQLite-based persistent storage for interactions, patterns and knowledge

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    normalize_question, CommonQuestion, Interaction, KnowledgeItem, LearningPattern, LearningStats,
    NewInteraction, PatternUsage, DEFAULT_COMMON_QUESTIONS, DEFAULT_KNOWLEDGE, MAX_EXAMPLE_QUESTIONS,
};
use crate::error::StorageError;
use crate::learning::PatternDefinition;
use crate::types::Emotion;

type Result<T> = std::result::Result<T, StorageError>;

/// SQLite-based knowledge store
///
/// The connection sits behind an async mutex; callers are expected to run a
/// single message pipeline at a time, the lock only keeps the background
/// improvement task from interleaving statements.
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
}

impl KnowledgeStore {
    /// Open (or create) a store at the given path
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self::from_connection(conn)?;
        info!("Opened knowledge store at {}", path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Self::seed_knowledge(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_input TEXT NOT NULL,
                ai_response TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                is_valuable INTEGER NOT NULL DEFAULT 0,
                pattern_detected TEXT,
                sentiment TEXT,
                confidence REAL NOT NULL DEFAULT 0.5
            );

            CREATE TABLE IF NOT EXISTS learning_patterns (
                pattern_name TEXT PRIMARY KEY,
                detection_keywords TEXT NOT NULL,
                example_questions TEXT NOT NULL DEFAULT '[]',
                count INTEGER NOT NULL DEFAULT 0,
                last_used TEXT,
                response_style TEXT
            );

            CREATE TABLE IF NOT EXISTS common_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT UNIQUE NOT NULL,
                answer TEXT NOT NULL,
                usage_count INTEGER NOT NULL DEFAULT 0,
                last_used TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS personal_info (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS knowledge (
                topic TEXT PRIMARY KEY,
                details TEXT NOT NULL,
                confidence REAL NOT NULL DEFAULT 0.5,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_interactions_pattern ON interactions(pattern_detected);
            CREATE INDEX IF NOT EXISTS idx_patterns_count ON learning_patterns(count DESC);
        "#)?;

        Ok(())
    }

    fn seed_knowledge(conn: &Connection) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        for (topic, details) in DEFAULT_KNOWLEDGE {
            conn.execute(
                "INSERT OR IGNORE INTO knowledge (topic, details, confidence, updated_at) VALUES (?1, ?2, 0.5, ?3)",
                params![topic, details, now],
            )?;
        }
        Ok(())
    }

    // --- Interactions ---

    /// Insert an interaction and return its id
    pub async fn log_interaction(&self, record: &NewInteraction) -> Result<i64> {
        let conn = self.conn.lock().await;

        conn.execute(
            r#"INSERT INTO interactions
               (user_input, ai_response, timestamp, is_valuable, pattern_detected, sentiment, confidence)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                record.user_input,
                record.ai_response,
                Utc::now().to_rfc3339(),
                record.is_valuable,
                record.pattern_detected,
                record.sentiment.map(|s| s.as_str()),
                clamp_unit(record.confidence),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Logged interaction {}", id);
        Ok(id)
    }

    /// Most recent interactions first, optionally limited to pattern categories
    pub async fn recent_interactions(&self, limit: usize, categories: &[String]) -> Result<Vec<Interaction>> {
        let conn = self.conn.lock().await;

        let mut sql = String::from(
            "SELECT id, user_input, ai_response, timestamp, is_valuable, pattern_detected, sentiment, confidence \
             FROM interactions",
        );
        let mut values: Vec<Value> = Vec::with_capacity(categories.len() + 1);

        if !categories.is_empty() {
            let placeholders = vec!["?"; categories.len()].join(", ");
            sql.push_str(&format!(" WHERE pattern_detected IN ({})", placeholders));
            values.extend(categories.iter().map(|c| Value::Text(c.clone())));
        }

        sql.push_str(" ORDER BY id DESC LIMIT ?");
        values.push(Value::Integer(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_interaction)?;
        let interactions = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(interactions)
    }

    // --- Learning patterns ---

    /// Insert pattern categories that are not stored yet
    pub async fn seed_patterns(&self, patterns: &[PatternDefinition]) -> Result<usize> {
        let conn = self.conn.lock().await;
        let mut inserted = 0;

        for pattern in patterns {
            let keywords = serde_json::to_string(&pattern.keywords)?;
            inserted += conn.execute(
                r#"INSERT OR IGNORE INTO learning_patterns
                   (pattern_name, detection_keywords, example_questions, count, response_style)
                   VALUES (?1, ?2, '[]', 0, ?3)"#,
                params![pattern.name, keywords, pattern.response_style],
            )?;
        }

        if inserted > 0 {
            info!("Seeded {} learning pattern(s)", inserted);
        }
        Ok(inserted)
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Option<LearningPattern>> {
        let conn = self.conn.lock().await;
        let pattern = conn
            .query_row(
                r#"SELECT pattern_name, detection_keywords, example_questions, count, last_used, response_style
                   FROM learning_patterns WHERE pattern_name = ?1"#,
                params![name],
                row_to_pattern,
            )
            .optional()?;
        Ok(pattern)
    }

    /// Count a detection hit and remember the example, keeping the last five
    pub async fn record_pattern_hit(&self, name: &str, example: &str) -> Result<bool> {
        let conn = self.conn.lock().await;

        let current: Option<String> = conn
            .query_row(
                "SELECT example_questions FROM learning_patterns WHERE pattern_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            return Ok(false);
        };

        let mut examples = parse_string_list(&current, "example_questions");
        examples.push(example.to_string());
        if examples.len() > MAX_EXAMPLE_QUESTIONS {
            let excess = examples.len() - MAX_EXAMPLE_QUESTIONS;
            examples.drain(..excess);
        }

        conn.execute(
            r#"UPDATE learning_patterns
               SET count = count + 1, last_used = ?1, example_questions = ?2
               WHERE pattern_name = ?3"#,
            params![Utc::now().to_rfc3339(), serde_json::to_string(&examples)?, name],
        )?;

        Ok(true)
    }

    pub async fn list_patterns(&self) -> Result<Vec<LearningPattern>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"SELECT pattern_name, detection_keywords, example_questions, count, last_used, response_style
               FROM learning_patterns ORDER BY count DESC, pattern_name ASC"#,
        )?;
        let rows = stmt.query_map([], row_to_pattern)?;
        let patterns = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patterns)
    }

    // --- Common questions ---

    /// All common questions, most used first; seeds the defaults when empty
    pub async fn common_questions(&self) -> Result<Vec<CommonQuestion>> {
        let conn = self.conn.lock().await;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM common_questions", [], |row| row.get(0))?;
        if count == 0 {
            let now = Utc::now().to_rfc3339();
            for (question, answer) in DEFAULT_COMMON_QUESTIONS {
                conn.execute(
                    "INSERT OR IGNORE INTO common_questions (question, answer, usage_count, created_at) VALUES (?1, ?2, 0, ?3)",
                    params![question, answer, now],
                )?;
            }
            info!("Seeded {} default common question(s)", DEFAULT_COMMON_QUESTIONS.len());
        }

        let mut stmt = conn.prepare(
            "SELECT question, answer, usage_count, last_used FROM common_questions ORDER BY usage_count DESC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let usage: i64 = row.get(2)?;
            let last_used: Option<String> = row.get(3)?;
            Ok(CommonQuestion {
                question: row.get(0)?,
                answer: row.get(1)?,
                usage_count: usage.max(0) as u64,
                last_used: last_used.as_deref().map(parse_timestamp),
            })
        })?;
        let questions = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    /// Add a question; an existing question keeps its original answer
    pub async fn add_common_question(&self, question: &str, answer: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO common_questions (question, answer, usage_count, created_at) VALUES (?1, ?2, 0, ?3)",
            params![question.trim(), answer.trim(), Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// Find a stored question whose words appear, in order and adjacent, in
    /// the input. Matching is on whole words, never inside one.
    pub async fn find_common_question(&self, input: &str) -> Result<Option<CommonQuestion>> {
        let needle = normalize_question(input);
        let input_words: Vec<&str> = needle.split(' ').filter(|w| !w.is_empty()).collect();
        if input_words.is_empty() {
            return Ok(None);
        }

        let questions = self.common_questions().await?;
        Ok(questions.into_iter().find(|q| {
            let key = normalize_question(&q.question);
            let key_words: Vec<&str> = key.split(' ').filter(|w| !w.is_empty()).collect();
            contains_words(&input_words, &key_words)
        }))
    }

    pub async fn record_question_usage(&self, question: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE common_questions SET usage_count = usage_count + 1, last_used = ?1 WHERE question = ?2",
            params![Utc::now().to_rfc3339(), question],
        )?;
        Ok(updated > 0)
    }

    // --- Personal info ---

    pub async fn get_personal_info(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let value = conn
            .query_row("SELECT value FROM personal_info WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub async fn set_personal_info(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO personal_info (key, value, last_updated) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_updated = excluded.last_updated"#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // --- Knowledge ---

    /// Insert or replace what is known about a topic
    pub async fn upsert_knowledge(&self, topic: &str, details: &str, confidence: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO knowledge (topic, details, confidence, updated_at) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(topic) DO UPDATE SET
                   details = excluded.details,
                   confidence = excluded.confidence,
                   updated_at = excluded.updated_at"#,
            params![topic, details, clamp_unit(confidence), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub async fn get_knowledge(&self, topic: &str) -> Result<Option<KnowledgeItem>> {
        let conn = self.conn.lock().await;
        let item = conn
            .query_row(
                "SELECT topic, details, confidence, updated_at FROM knowledge WHERE topic = ?1",
                params![topic],
                row_to_knowledge,
            )
            .optional()?;
        Ok(item)
    }

    /// Everything learned so far, most confident first
    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeItem>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT topic, details, confidence, updated_at FROM knowledge ORDER BY confidence DESC, topic ASC",
        )?;
        let rows = stmt.query_map([], row_to_knowledge)?;
        let items = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Delete a topic; returns whether it existed
    pub async fn forget_knowledge(&self, topic: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM knowledge WHERE topic = ?1", params![topic])?;
        if deleted > 0 {
            info!("Forgot knowledge topic '{}'", topic);
        }
        Ok(deleted > 0)
    }

    // --- History ---

    /// The last `limit` exchanges in the order they happened
    pub async fn conversation_history(&self, limit: usize) -> Result<Vec<Interaction>> {
        let mut history = self.recent_interactions(limit, &[]).await?;
        history.reverse();
        Ok(history)
    }

    // --- Maintenance ---

    pub async fn learning_stats(&self) -> Result<LearningStats> {
        let conn = self.conn.lock().await;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
        let valuable: i64 = conn.query_row(
            "SELECT COUNT(*) FROM interactions WHERE is_valuable = 1",
            [],
            |row| row.get(0),
        )?;
        let knowledge: i64 = conn.query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT pattern_name, count FROM learning_patterns ORDER BY count DESC, pattern_name ASC LIMIT 3",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(PatternUsage {
                name: row.get(0)?,
                count: count.max(0) as u64,
            })
        })?;
        let top_patterns = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LearningStats {
            total_interactions: total.max(0) as u64,
            valuable_interactions: valuable.max(0) as u64,
            knowledge_items: knowledge.max(0) as u64,
            top_patterns,
        })
    }

    /// Write a consistent copy of the database to `path`
    pub async fn backup<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = self.conn.lock().await;
        conn.execute("VACUUM INTO ?1", params![path.to_string_lossy().to_string()])?;
        info!("Backed up knowledge store to {}", path.display());
        Ok(())
    }
}

fn row_to_interaction(row: &Row<'_>) -> rusqlite::Result<Interaction> {
    let timestamp: String = row.get(3)?;
    let sentiment: Option<String> = row.get(6)?;
    Ok(Interaction {
        id: row.get(0)?,
        user_input: row.get(1)?,
        ai_response: row.get(2)?,
        timestamp: parse_timestamp(&timestamp),
        is_valuable: row.get(4)?,
        pattern_detected: row.get(5)?,
        sentiment: sentiment.as_deref().and_then(Emotion::parse),
        confidence: row.get(7)?,
    })
}

fn row_to_knowledge(row: &Row<'_>) -> rusqlite::Result<KnowledgeItem> {
    let updated_at: String = row.get(3)?;
    Ok(KnowledgeItem {
        topic: row.get(0)?,
        details: row.get(1)?,
        confidence: row.get(2)?,
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_pattern(row: &Row<'_>) -> rusqlite::Result<LearningPattern> {
    let keywords: String = row.get(1)?;
    let examples: String = row.get(2)?;
    let count: i64 = row.get(3)?;
    let last_used: Option<String> = row.get(4)?;
    Ok(LearningPattern {
        name: row.get(0)?,
        detection_keywords: parse_string_list(&keywords, "detection_keywords"),
        example_questions: parse_string_list(&examples, "example_questions"),
        usage_count: count.max(0) as u64,
        last_used: last_used.as_deref().map(parse_timestamp),
        response_style: row.get(5)?,
    })
}

/// Decode a JSON string list; corrupt data is reported and read as empty
fn parse_string_list(value: &str, column: &str) -> Vec<String> {
    match serde_json::from_str(value) {
        Ok(list) => list,
        Err(e) => {
            warn!("Corrupt {} JSON in knowledge store, treating as empty: {}", column, e);
            Vec::new()
        }
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!("Invalid timestamp '{}' in knowledge store, using now: {}", value, e);
            Utc::now()
        }
    }
}

fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn interaction(input: &str, pattern: Option<&str>) -> NewInteraction {
        NewInteraction {
            user_input: input.to_string(),
            ai_response: format!("reply to {}", input),
            pattern_detected: pattern.map(|p| p.to_string()),
            confidence: 0.5,
            ..Default::default()
        }
    }

    fn pattern(name: &str, keywords: &[&str]) -> PatternDefinition {
        PatternDefinition {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            response_style: "detailed".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recent_interactions_newest_first_and_filtered() {
        let store = KnowledgeStore::in_memory().unwrap();
        store.log_interaction(&interaction("one", Some("error"))).await.unwrap();
        store.log_interaction(&interaction("two", Some("technical"))).await.unwrap();
        store.log_interaction(&interaction("three", None)).await.unwrap();
        store.log_interaction(&interaction("four", Some("error"))).await.unwrap();

        let all = store.recent_interactions(10, &[]).await.unwrap();
        let inputs: Vec<_> = all.iter().map(|i| i.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["four", "three", "two", "one"]);

        let limited = store.recent_interactions(2, &[]).await.unwrap();
        assert_eq!(limited.len(), 2);

        let errors = store.recent_interactions(10, &["error".to_string()]).await.unwrap();
        let inputs: Vec<_> = errors.iter().map(|i| i.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["four", "one"]);
    }

    #[tokio::test]
    async fn test_interaction_confidence_is_clamped() {
        let store = KnowledgeStore::in_memory().unwrap();
        let mut record = interaction("x", None);
        record.confidence = 4.2;
        record.sentiment = Some(Emotion::Happy);
        store.log_interaction(&record).await.unwrap();

        let stored = store.recent_interactions(1, &[]).await.unwrap();
        assert_eq!(stored[0].confidence, 1.0);
        assert_eq!(stored[0].sentiment, Some(Emotion::Happy));
    }

    #[tokio::test]
    async fn test_pattern_hits_keep_last_five_examples() {
        let store = KnowledgeStore::in_memory().unwrap();
        store.seed_patterns(&[pattern("technical", &["كود"])]).await.unwrap();

        for i in 0..7 {
            assert!(store.record_pattern_hit("technical", &format!("q{}", i)).await.unwrap());
        }

        let stored = store.get_pattern("technical").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 7);
        assert_eq!(stored.example_questions, vec!["q2", "q3", "q4", "q5", "q6"]);
        assert_eq!(stored.detection_keywords, vec!["كود"]);
        assert!(stored.last_used.is_some());

        assert!(!store.record_pattern_hit("unknown", "q").await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_patterns_is_idempotent() {
        let store = KnowledgeStore::in_memory().unwrap();
        let patterns = [pattern("technical", &["كود"]), pattern("error", &["خطأ"])];
        assert_eq!(store.seed_patterns(&patterns).await.unwrap(), 2);
        store.record_pattern_hit("error", "خطأ هنا").await.unwrap();
        assert_eq!(store.seed_patterns(&patterns).await.unwrap(), 0);
        assert_eq!(store.get_pattern("error").await.unwrap().unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn test_common_questions_seeded_and_counted() {
        let store = KnowledgeStore::in_memory().unwrap();
        let questions = store.common_questions().await.unwrap();
        assert_eq!(questions.len(), DEFAULT_COMMON_QUESTIONS.len());

        let found = store.find_common_question("من أنا؟").await.unwrap().unwrap();
        assert_eq!(found.answer, "أنت المستخدم الذي أتفاعل معه وأتعلم منه يومياً");
        assert!(store.record_question_usage(&found.question).await.unwrap());

        let questions = store.common_questions().await.unwrap();
        assert_eq!(questions[0].question, "من أنا");
        assert_eq!(questions[0].usage_count, 1);

        assert!(store.find_common_question("الطقس اليوم").await.unwrap().is_none());
        assert!(store.find_common_question("قل لي من أنا الآن").await.unwrap().is_some());
        assert!(store.find_common_question("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_common_question_needs_whole_words() {
        let store = KnowledgeStore::in_memory().unwrap();
        // "تضمن أنابيب" spans the characters of "من أنا"
        assert!(store
            .find_common_question("هل تضمن أنابيب المياه الجودة")
            .await
            .unwrap()
            .is_none());
        assert!(store.find_common_question("أنا").await.unwrap().is_none());
    }

    #[test]
    fn test_corrupt_stored_values_fall_back() {
        assert!(parse_string_list("not json", "example_questions").is_empty());
        assert_eq!(parse_string_list(r#"["a","b"]"#, "example_questions"), vec!["a", "b"]);

        let before = Utc::now();
        assert!(parse_timestamp("yesterday") >= before);
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00+00:00").to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_corrupt_examples_are_replaced_on_hit() {
        let store = KnowledgeStore::in_memory().unwrap();
        store.seed_patterns(&[pattern("error", &["خطأ"])]).await.unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "UPDATE learning_patterns SET example_questions = '{broken' WHERE pattern_name = 'error'",
                [],
            )
            .unwrap();
        }

        assert!(store.get_pattern("error").await.unwrap().unwrap().example_questions.is_empty());
        assert!(store.record_pattern_hit("error", "خطأ جديد").await.unwrap());
        let stored = store.get_pattern("error").await.unwrap().unwrap();
        assert_eq!(stored.example_questions, vec!["خطأ جديد"]);
    }

    #[test]
    fn test_contains_words() {
        assert!(contains_words(&["قل", "لي", "من", "أنا"], &["من", "أنا"]));
        assert!(!contains_words(&["من", "قل", "أنا"], &["من", "أنا"]));
        assert!(!contains_words(&["من"], &["من", "أنا"]));
        assert!(!contains_words(&["من"], &[]));
    }

    #[tokio::test]
    async fn test_common_question_answer_is_immutable() {
        let store = KnowledgeStore::in_memory().unwrap();
        assert!(store.add_common_question("ما لونك المفضل", "الأزرق").await.unwrap());
        assert!(!store.add_common_question("ما لونك المفضل", "الأحمر").await.unwrap());
        let found = store.find_common_question("ما لونك المفضل؟").await.unwrap().unwrap();
        assert_eq!(found.answer, "الأزرق");
    }

    #[tokio::test]
    async fn test_personal_info_upsert() {
        let store = KnowledgeStore::in_memory().unwrap();
        assert!(store.get_personal_info("name").await.unwrap().is_none());
        store.set_personal_info("name", "سارة").await.unwrap();
        store.set_personal_info("name", "ليلى").await.unwrap();
        assert_eq!(store.get_personal_info("name").await.unwrap().as_deref(), Some("ليلى"));
    }

    #[tokio::test]
    async fn test_knowledge_upsert_and_stats() {
        let store = KnowledgeStore::in_memory().unwrap();
        store.upsert_knowledge("rust", "systems language", 1.7).await.unwrap();
        store.upsert_knowledge("rust", "memory safe systems language", 0.8).await.unwrap();

        let item = store.get_knowledge("rust").await.unwrap().unwrap();
        assert_eq!(item.details, "memory safe systems language");
        assert_eq!(item.confidence, 0.8);

        let mut valuable = interaction("v", None);
        valuable.is_valuable = true;
        store.log_interaction(&valuable).await.unwrap();
        store.log_interaction(&interaction("n", None)).await.unwrap();

        let stats = store.learning_stats().await.unwrap();
        assert_eq!(stats.total_interactions, 2);
        assert_eq!(stats.valuable_interactions, 1);
        assert_eq!(stats.knowledge_items, DEFAULT_KNOWLEDGE.len() as u64 + 1);
    }

    #[tokio::test]
    async fn test_list_and_forget_knowledge() {
        let store = KnowledgeStore::in_memory().unwrap();
        store.upsert_knowledge("rust", "memory safe systems language", 0.9).await.unwrap();

        let items = store.list_knowledge().await.unwrap();
        assert_eq!(items.len(), DEFAULT_KNOWLEDGE.len() + 1);
        assert_eq!(items[0].topic, "rust");

        assert!(store.forget_knowledge("rust").await.unwrap());
        assert!(!store.forget_knowledge("rust").await.unwrap());
        assert!(store.get_knowledge("rust").await.unwrap().is_none());
        assert_eq!(store.list_knowledge().await.unwrap().len(), DEFAULT_KNOWLEDGE.len());
    }

    #[tokio::test]
    async fn test_conversation_history_is_chronological() {
        let store = KnowledgeStore::in_memory().unwrap();
        assert!(store.conversation_history(5).await.unwrap().is_empty());

        for input in ["one", "two", "three", "four"] {
            store.log_interaction(&interaction(input, None)).await.unwrap();
        }

        let history = store.conversation_history(3).await.unwrap();
        let inputs: Vec<_> = history.iter().map(|i| i.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["two", "three", "four"]);
        assert_eq!(history[2].ai_response, "reply to four");
    }

    #[tokio::test]
    async fn test_file_store_backup() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::open(dir.path().join("mani.db")).await.unwrap();
        store.log_interaction(&interaction("persisted", None)).await.unwrap();

        let backup_path = dir.path().join("backups").join("copy.db");
        store.backup(&backup_path).await.unwrap();

        let copy = KnowledgeStore::open(&backup_path).await.unwrap();
        let rows = copy.recent_interactions(5, &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_input, "persisted");
    }
}
