//! Row types shared between the engine services and store backends

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::draft::Segment;
use crate::text::Stopwords;

/// A language known to the store. Unique by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Observation counts for one candidate translation of a memory token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub frequency: u64,
}

/// One translation-memory row: a source token and everything learned about
/// it for one target language. A row with `trg_lang = None` carries
/// metadata shared across targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationMemoryRow {
    pub src_lang: String,
    pub trg_lang: Option<String>,
    pub token: String,
    pub translations: BTreeMap<String, TranslationStats>,
    pub metadata: Option<serde_json::Value>,
}

/// A source sentence and its evolving draft within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceRow {
    pub project_id: i64,
    pub sentence_id: i64,
    /// Human-readable id, `"<book>,<chapter>,<verse>"` for Bible content.
    pub surrogate_id: String,
    pub sentence: String,
    pub draft: String,
    pub draft_meta: Vec<Segment>,
    /// Optimistic-concurrency column; bumped on every committed write.
    pub version: i64,
}

impl SentenceRow {
    /// A fresh sentence: draft equals source, one untranslated segment.
    pub fn fresh(project_id: i64, sentence_id: i64, surrogate_id: String, sentence: String) -> Self {
        let draft_meta = crate::draft::fresh_meta(&sentence);
        SentenceRow {
            project_id,
            sentence_id,
            surrogate_id,
            draft: sentence.clone(),
            sentence,
            draft_meta,
            version: 0,
        }
    }
}

/// Per-project configuration stored in the metadata JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub books: Vec<String>,
    #[serde(default = "default_true")]
    pub use_data_for_learning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords: Option<Stopwords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punctuations: Option<Vec<char>>,
}

fn default_true() -> bool {
    true
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        ProjectMetadata {
            books: Vec::new(),
            use_data_for_learning: true,
            stopwords: None,
            punctuations: None,
        }
    }
}

/// A translation project: a language pair plus its sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub source: Language,
    pub target: Language,
    pub metadata: ProjectMetadata,
    pub active: bool,
}

/// One verse from a stored Bible version or an uploaded USFM book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub book_code: String,
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    pub text: String,
}

impl VerseRecord {
    pub fn ref_id(&self) -> i64 {
        ref_id(self.book_id, self.chapter, self.verse)
    }

    pub fn surrogate_id(&self) -> String {
        format!("{},{},{}", self.book_code, self.chapter, self.verse)
    }
}

/// Which sentences of a project to operate on. An empty selector means all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceSelector {
    pub books: Option<Vec<String>>,
    pub id_range: Option<(i64, i64)>,
    pub id_list: Option<Vec<i64>>,
}

impl SentenceSelector {
    pub fn all() -> Self {
        SentenceSelector::default()
    }

    pub fn for_books(books: Vec<String>) -> Self {
        SentenceSelector {
            books: Some(books),
            ..SentenceSelector::default()
        }
    }
}

/// Project listing filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    pub name: Option<String>,
    pub source_code: Option<String>,
    pub target_code: Option<String>,
    pub active: Option<bool>,
}

// =============================================================================
// BIBLE BOOK TABLE
// =============================================================================

/// USFM codes for the 66 books, in canonical order. Book ids are 1-based
/// indices into this table.
pub const BOOK_CODES: [&str; 66] = [
    "gen", "exo", "lev", "num", "deu", "jos", "jdg", "rut", "1sa", "2sa", "1ki", "2ki", "1ch",
    "2ch", "ezr", "neh", "est", "job", "psa", "pro", "ecc", "sng", "isa", "jer", "lam", "ezk",
    "dan", "hos", "jol", "amo", "oba", "jon", "mic", "nam", "hab", "zep", "hag", "zec", "mal",
    "mat", "mrk", "luk", "jhn", "act", "rom", "1co", "2co", "gal", "eph", "php", "col", "1th",
    "2th", "1ti", "2ti", "tit", "phm", "heb", "jas", "1pe", "2pe", "1jn", "2jn", "3jn", "jud",
    "rev",
];

/// USFM book code for a 1-based book number.
pub fn book_code(book_num: i64) -> Option<&'static str> {
    if (1..=BOOK_CODES.len() as i64).contains(&book_num) {
        Some(BOOK_CODES[(book_num - 1) as usize])
    } else {
        None
    }
}

/// 1-based book number for a USFM code (case-insensitive).
pub fn book_id(code: &str) -> Option<i64> {
    let code = code.to_lowercase();
    BOOK_CODES
        .iter()
        .position(|c| *c == code)
        .map(|i| i as i64 + 1)
}

/// Compose a Bible reference id: `book*1_000_000 + chapter*1_000 + verse`.
pub fn ref_id(book: i64, chapter: i64, verse: i64) -> i64 {
    book * 1_000_000 + chapter * 1_000 + verse
}

/// Split a reference id back into `(book, chapter, verse)`.
pub fn split_ref_id(ref_id: i64) -> (i64, i64, i64) {
    (ref_id / 1_000_000, (ref_id / 1_000) % 1_000, ref_id % 1_000)
}

/// Valid reference-id range for Bible content.
pub const MIN_REF_ID: i64 = 1_001_001;
pub const MAX_REF_ID: i64 = 66_999_999;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::SegmentStatus;

    #[test]
    fn book_table_round_trips() {
        assert_eq!(book_code(1), Some("gen"));
        assert_eq!(book_code(66), Some("rev"));
        assert_eq!(book_code(0), None);
        assert_eq!(book_code(67), None);
        assert_eq!(book_id("GEN"), Some(1));
        assert_eq!(book_id("rev"), Some(66));
        assert_eq!(book_id("xyz"), None);
        for (i, code) in BOOK_CODES.iter().enumerate() {
            assert_eq!(book_id(code), Some(i as i64 + 1));
        }
    }

    #[test]
    fn ref_ids_compose_and_split() {
        let id = ref_id(43, 3, 16);
        assert_eq!(id, 43_003_016);
        assert_eq!(split_ref_id(id), (43, 3, 16));
        assert!(id >= MIN_REF_ID && id <= MAX_REF_ID);
    }

    #[test]
    fn fresh_sentence_covers_itself() {
        let row = SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), "In the beginning".into());
        assert_eq!(row.draft, row.sentence);
        assert_eq!(row.draft_meta.len(), 1);
        assert_eq!(row.draft_meta[0].src, (0, row.sentence.len()));
        assert_eq!(row.draft_meta[0].status, SegmentStatus::Untranslated);
        assert_eq!(row.version, 0);
    }

    #[test]
    fn project_metadata_defaults_learning_on() {
        let meta: ProjectMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.use_data_for_learning);
        assert!(meta.books.is_empty());
        assert!(meta.stopwords.is_none());
    }
}
