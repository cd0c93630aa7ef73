//! Bad-word detection.
//!
//! Whole-word, case-insensitive matching against a global list compiled once
//! at startup, plus a per-call list of tenant words. Words may begin or end
//! with punctuation, as in `c++` or `$hit`.

use comment_common::{AppError, AppResult, ModerationConfig};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Detects configured bad words in comment content.
#[derive(Debug, Clone)]
pub struct BadWordDetector {
    global: Option<Regex>,
}

impl BadWordDetector {
    /// Build a detector from the global word list.
    ///
    /// An empty list or `enabled == false` yields a detector that only ever
    /// reports tenant words.
    pub fn new(words: &[String], enabled: bool) -> AppResult<Self> {
        let global = if enabled {
            compile(words).map_err(|e| AppError::Config(format!("invalid bad word list: {e}")))?
        } else {
            None
        };
        Ok(Self { global })
    }

    /// Build a detector from the moderation config section.
    pub fn from_config(config: &ModerationConfig) -> AppResult<Self> {
        Self::new(&config.bad_words, config.bad_words_enabled)
    }

    /// Return every distinct bad word found in `content`, global matches first.
    ///
    /// Matches that differ only in case are reported once, using the casing
    /// seen first. An empty result means nothing matched.
    #[must_use]
    pub fn scan(&self, content: &str, custom_words: &[String]) -> Vec<String> {
        let custom = match compile(custom_words) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unusable custom bad word list");
                None
            }
        };

        let mut seen = HashSet::new();
        let mut flagged = Vec::new();
        for regex in self.global.iter().chain(custom.iter()) {
            for found in regex.find_iter(content) {
                let word = found.as_str();
                if seen.insert(word.to_lowercase()) {
                    flagged.push(word.to_string());
                }
            }
        }
        flagged
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escaped pattern for one word. A boundary is only asserted on a side that
/// ends in a word character; `\b` can never match next to `+` or `$`.
fn word_pattern(word: &str) -> String {
    let starts_word = word.chars().next().is_some_and(is_word_char);
    let ends_word = word.chars().next_back().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(word),
        if ends_word { r"\b" } else { "" },
    )
}

/// Compile `words` into one alternation; `None` when there is nothing to match.
fn compile(words: &[String]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(word_pattern)
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
}
