//! Text utilities: normalization and per-language character tables
//!
//! Sentences are stored NFC-normalized so that byte offsets recorded by the
//! tokenizer stay valid across reads. The punctuation and stopword tables
//! here are the defaults; projects may override both per request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// NFC-normalize a string. Applied to every sentence and project name
/// before storage so offsets computed later are stable.
pub fn normalize_unicode(text: &str) -> String {
    text.nfc().collect()
}

/// Default punctuation characters used for chunk splitting and context
/// stripping. Includes common Latin punctuation plus the Devanagari danda
/// marks that terminate sentences in many Indic scripts.
pub fn punctuations() -> Vec<char> {
    vec![
        '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', ':', ';', '<',
        '=', '>', '?', '@', '[', '\\', ']', '^', '_', '`', '{', '|', '}', '~', '\u{2018}',
        '\u{2019}', '\u{201C}', '\u{201D}', '\u{2026}', '\u{2013}', '\u{2014}', '\u{0964}',
        '\u{0965}',
    ]
}

/// ASCII digits. Callers that want numbers to split tokens append these to
/// the punctuation set.
pub fn numbers() -> Vec<char> {
    ('0'..='9').collect()
}

/// Punctuations plus digits: the default splitting class when a request
/// does not override it.
pub fn default_punctuations() -> Vec<char> {
    let mut chars = punctuations();
    chars.extend(numbers());
    chars
}

/// Remove every character of `puncts` from `text`.
pub fn strip_punctuation(text: &str, puncts: &[char]) -> String {
    text.chars().filter(|c| !puncts.contains(c)).collect()
}

/// Stopwords for one language, split by where they attach: prepositions
/// lead the content word they modify, postpositions trail it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwords {
    #[serde(default)]
    pub prepositions: HashSet<String>,
    #[serde(default)]
    pub postpositions: HashSet<String>,
}

impl Stopwords {
    pub fn is_empty(&self) -> bool {
        self.prepositions.is_empty() && self.postpositions.is_empty()
    }

    /// True if the word appears in either table.
    pub fn contains(&self, word: &str) -> bool {
        self.prepositions.contains(word) || self.postpositions.contains(word)
    }
}

fn set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

/// Built-in stopword tables. Languages without an entry get an empty table,
/// which disables phrase building (every word is a content word).
pub fn stopwords(lang_code: &str) -> Stopwords {
    match lang_code {
        "hi" => Stopwords {
            prepositions: set(&["के", "का", "की", "एक", "यह", "वह"]),
            postpositions: set(&["को", "से", "में", "ने", "पर", "तक"]),
        },
        "en" => Stopwords {
            prepositions: set(&["a", "an", "the", "of", "in", "on", "at", "to", "for"]),
            postpositions: HashSet::new(),
        },
        _ => Stopwords::default(),
    }
}
