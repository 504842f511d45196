//! Phrase tokenization.
//!
//! # Invariants
//! - Tokens are lower-case alphanumeric runs, optionally joined by embedded
//!   apostrophes (`don't`).
//! - Stop-words are dropped; order and duplicates are preserved.
//! - The result is never empty: with no content words left, the whole trimmed
//!   lower-cased input becomes the single token. Blank input yields one empty
//!   token.
//! - Tokens never carry control characters or other characters XML cannot
//!   hold.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z0-9]+)*").expect("valid word regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "he", "her", "his", "i", "in", "is", "it", "its", "me", "my", "of", "on", "or", "our",
        "she", "so", "that", "the", "their", "them", "then", "there", "these", "they", "this",
        "to", "us", "was", "we", "were", "what", "which", "who", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Splits a phrase into content-word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'");
    let tokens: Vec<String> = WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word))
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        return vec![fallback_token(&lowered)];
    }
    tokens
}

/// Whole-input token: whitespace controls become spaces, other controls and
/// XML non-characters are dropped.
fn fallback_token(lowered: &str) -> String {
    let cleaned: String = lowered
        .chars()
        .filter_map(|ch| {
            if ch.is_whitespace() {
                Some(' ')
            } else if ch.is_control() || matches!(ch, '\u{fffe}' | '\u{ffff}') {
                None
            } else {
                Some(ch)
            }
        })
        .collect();
    cleaned.trim().to_string()
}

/// Splits composite input into non-blank clauses, one per line.
pub fn split_clauses(text: &str) -> Vec<&str> {
    let clauses: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if clauses.is_empty() {
        return vec![text.trim()];
    }
    clauses
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}
