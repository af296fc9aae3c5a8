//! The transactional row store behind the engine
//!
//! Services talk to storage through [`TranslationStore`] only. Two
//! backends ship: an in-memory store used by tests and demos, and a
//! Postgres store (feature `database`) that maps each method onto SQL with
//! row-level serialization for concurrent writers.

pub mod memory;
pub mod models;
#[cfg(feature = "database")]
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use models::{
    Language, ProjectFilter, ProjectRow, SentenceRow, SentenceSelector, TranslationMemoryRow,
    VerseRecord,
};

/// Abstract key/row API over languages, projects, sentences, translation
/// memory, and stored Bible versions.
///
/// Write-side contract: `save_sentence` must reject stale versions with
/// `Conflict`, and `add_translation` must apply its frequency increment
/// under a row-level lock so concurrent confirmations serialize.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    // ---- languages -------------------------------------------------------
    async fn language(&self, code: &str) -> Result<Option<Language>>;
    async fn add_language(&self, code: &str, name: &str) -> Result<Language>;

    // ---- translation memory ---------------------------------------------
    /// All known tokens for a source language, across targets. Feeds the
    /// memory trie used during tokenization.
    async fn memory_tokens(&self, src_code: &str) -> Result<Vec<String>>;

    async fn memory_row(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
    ) -> Result<Option<TranslationMemoryRow>>;

    /// Metadata attached to the same `(src, token)` under any other target,
    /// used to seed fresh rows.
    async fn cross_target_metadata(
        &self,
        src_code: &str,
        token: &str,
    ) -> Result<Option<serde_json::Value>>;

    /// Record `occurrences` observations of `token -> translation`.
    /// Creates the row (copying cross-target metadata) or increments the
    /// stored frequency atomically.
    async fn add_translation(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
        translation: &str,
        occurrences: u64,
    ) -> Result<()>;

    // ---- projects --------------------------------------------------------
    async fn create_project(&self, project: ProjectRow) -> Result<ProjectRow>;
    async fn project(&self, project_id: i64) -> Result<Option<ProjectRow>>;
    async fn update_project(&self, project: &ProjectRow) -> Result<()>;
    async fn projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRow>>;

    // ---- sentences -------------------------------------------------------
    async fn insert_sentences(&self, rows: Vec<SentenceRow>) -> Result<()>;
    async fn sentences(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
    ) -> Result<Vec<SentenceRow>>;
    async fn sentence(&self, project_id: i64, sentence_id: i64) -> Result<Option<SentenceRow>>;

    /// Persist a sentence draft. `row.version` must match the stored
    /// version; on success the stored version is bumped and the new value
    /// returned. A mismatch is a `Conflict`.
    async fn save_sentence(&self, row: &SentenceRow) -> Result<i64>;

    // ---- Bible content ---------------------------------------------------
    /// Verses of one book from a stored Bible version. The version name
    /// must refer to a Bible table (`TypeMismatch` otherwise).
    async fn bible_verses(&self, bible: &str, book_id: i64) -> Result<Vec<VerseRecord>>;
}

/// Whether a sentence id falls inside the selector. Book filters expand to
/// `bbb000000..=bbb999999` reference-id ranges.
pub(crate) fn selector_matches(selector: &SentenceSelector, sentence_id: i64) -> bool {
    if let Some(books) = &selector.books {
        let in_any = books.iter().any(|code| {
            models::book_id(code)
                .map(|id| {
                    let start = id * 1_000_000;
                    (start..=start + 999_999).contains(&sentence_id)
                })
                .unwrap_or(false)
        });
        if !in_any {
            return false;
        }
        return true;
    }
    if let Some((lo, hi)) = selector.id_range {
        return (lo..=hi).contains(&sentence_id);
    }
    if let Some(list) = &selector.id_list {
        return list.contains(&sentence_id);
    }
    true
}
