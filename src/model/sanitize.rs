//! Prompt and generated-text cleaning

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ModelConfig;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").expect("valid URL pattern"));
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Budgets and denylist applied around a generation call
#[derive(Debug, Clone)]
pub struct SanitizeSettings {
    pub max_prompt_chars: usize,
    pub max_output_chars: usize,
    pub max_sentences: usize,
    pub stop_phrases: Vec<String>,
}

impl From<&ModelConfig> for SanitizeSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_prompt_chars: config.max_prompt_chars,
            max_output_chars: config.max_output_chars,
            max_sentences: config.max_sentences,
            stop_phrases: config.stop_phrases.clone(),
        }
    }
}

impl Default for SanitizeSettings {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

/// Strip URLs and digit runs, trim, and cap the prompt at `max_chars` characters
pub fn clean_input(text: &str, max_chars: usize) -> String {
    let without_urls = URL_RE.replace_all(text, "");
    let without_digits = DIGITS_RE.replace_all(&without_urls, "");
    truncate_chars(without_digits.trim(), max_chars)
}

/// Post-process raw generated text.
///
/// Steps run in a fixed order: drop the echoed prompt, cut at the first stop
/// phrase, keep at most `max_sentences` sentences, collapse repeated terminal
/// punctuation, then cap the length.
pub fn clean_output(raw: &str, prompt: &str, settings: &SanitizeSettings) -> String {
    let mut text = if prompt.is_empty() {
        raw.to_string()
    } else {
        raw.replace(prompt, "")
    };
    text = text.trim().to_string();

    for phrase in settings.stop_phrases.iter().filter(|p| !p.is_empty()) {
        if let Some(idx) = text.find(phrase.as_str()) {
            text.truncate(idx);
        }
    }
    let mut text = text.trim().to_string();

    if settings.max_sentences > 0 {
        let sentences: Vec<&str> = text
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.len() > settings.max_sentences {
            text = format!("{}.", sentences[..settings.max_sentences].join(". "));
        }
    }

    let text = collapse_repeated_punctuation(&text);
    truncate_chars(&text, settings.max_output_chars)
}

/// Collapse runs of the same `?`, `.` or `!` into one mark
fn collapse_repeated_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if matches!(c, '?' | '.' | '!') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Character-based truncation (never splits a code point)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_phrase_cuts_and_trims() {
        let settings = SanitizeSettings::default();
        assert_eq!(clean_output("hello world اتصلوا بنا today", "", &settings), "hello world");
    }

    #[test]
    fn test_keeps_first_three_sentences() {
        let settings = SanitizeSettings::default();
        let cleaned = clean_output("one. two. three. four. five.", "", &settings);
        assert_eq!(cleaned, "one. two. three.");
    }

    #[test]
    fn test_short_text_keeps_its_sentences() {
        let settings = SanitizeSettings::default();
        assert_eq!(clean_output("one. two", "", &settings), "one. two");
    }

    #[test]
    fn test_removes_echoed_prompt() {
        let settings = SanitizeSettings::default();
        assert_eq!(clean_output("ما هو الطقس الجو جميل", "ما هو الطقس", &settings), "الجو جميل");
    }

    #[test]
    fn test_collapses_repeated_punctuation() {
        let settings = SanitizeSettings::default();
        assert_eq!(clean_output("really?? yes!!! ok?!", "", &settings), "really? yes! ok?!");
    }

    #[test]
    fn test_output_is_capped() {
        let settings = SanitizeSettings {
            max_output_chars: 4,
            ..SanitizeSettings::default()
        };
        assert_eq!(clean_output("مرحبا بك", "", &settings), "مرحب");
    }

    #[test]
    fn test_clean_input_strips_urls_and_digits() {
        assert_eq!(clean_input("see https://example.com/x page 42 now", 500), "see  page  now");
        assert_eq!(clean_input("  123  ", 500), "");
        assert_eq!(clean_input("أهلاً وسهلاً", 4).chars().count(), 4);
    }
}
