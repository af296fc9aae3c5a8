//! In-memory store backend
//!
//! Mirrors the Postgres backend's contract — version checks, row-serialized
//! memory updates, selector filtering — over plain maps behind one mutex.
//! Used by the integration tests and anywhere a database is overkill.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EngineError, Result};

use super::models::{
    book_id, Language, ProjectFilter, ProjectRow, SentenceRow, SentenceSelector,
    TranslationMemoryRow, TranslationStats, VerseRecord,
};
use super::{selector_matches, TranslationStore};

#[derive(Default)]
struct Inner {
    languages: HashMap<String, Language>,
    next_language_id: i64,
    memory: BTreeMap<(String, String, String), TranslationMemoryRow>,
    projects: HashMap<i64, ProjectRow>,
    next_project_id: i64,
    sentences: BTreeMap<(i64, i64), SentenceRow>,
    bibles: HashMap<String, BTreeMap<i64, VerseRecord>>,
}

/// Map-backed [`TranslationStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Store("memory store lock poisoned".into()))
    }

    /// Register a Bible version so projects can pull books from it. The
    /// name must end in `_bible`, matching the table-name convention the
    /// Postgres backend enforces.
    pub fn add_bible(&self, name: &str, verses: Vec<VerseRecord>) -> Result<()> {
        let mut inner = self.lock()?;
        let table = inner.bibles.entry(name.to_string()).or_default();
        for verse in verses {
            table.insert(verse.ref_id(), verse);
        }
        Ok(())
    }

    /// Pre-load translation-memory tokens, as after a bulk memory import.
    pub fn seed_memory_tokens(
        &self,
        src_code: &str,
        trg_code: &str,
        tokens: &[&str],
    ) -> Result<()> {
        let mut inner = self.lock()?;
        for token in tokens {
            let key = (
                src_code.to_string(),
                trg_code.to_string(),
                token.to_string(),
            );
            inner.memory.entry(key).or_insert_with(|| TranslationMemoryRow {
                src_lang: src_code.to_string(),
                trg_lang: Some(trg_code.to_string()),
                token: token.to_string(),
                translations: BTreeMap::new(),
                metadata: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn language(&self, code: &str) -> Result<Option<Language>> {
        Ok(self.lock()?.languages.get(code).cloned())
    }

    async fn add_language(&self, code: &str, name: &str) -> Result<Language> {
        let mut inner = self.lock()?;
        inner.next_language_id += 1;
        let language = Language {
            id: inner.next_language_id,
            code: code.to_string(),
            name: name.to_string(),
        };
        inner.languages.insert(code.to_string(), language.clone());
        Ok(language)
    }

    async fn memory_tokens(&self, src_code: &str) -> Result<Vec<String>> {
        let inner = self.lock()?;
        let tokens: std::collections::BTreeSet<String> = inner
            .memory
            .values()
            .filter(|row| row.src_lang == src_code)
            .map(|row| row.token.clone())
            .collect();
        Ok(tokens.into_iter().collect())
    }

    async fn memory_row(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
    ) -> Result<Option<TranslationMemoryRow>> {
        let key = (
            src_code.to_string(),
            trg_code.to_string(),
            token.to_string(),
        );
        Ok(self.lock()?.memory.get(&key).cloned())
    }

    async fn cross_target_metadata(
        &self,
        src_code: &str,
        token: &str,
    ) -> Result<Option<serde_json::Value>> {
        let inner = self.lock()?;
        Ok(inner
            .memory
            .values()
            .find(|row| row.src_lang == src_code && row.token == token && row.metadata.is_some())
            .and_then(|row| row.metadata.clone()))
    }

    async fn add_translation(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
        translation: &str,
        occurrences: u64,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let metadata = inner
            .memory
            .values()
            .find(|row| row.src_lang == src_code && row.token == token && row.metadata.is_some())
            .and_then(|row| row.metadata.clone());
        let key = (
            src_code.to_string(),
            trg_code.to_string(),
            token.to_string(),
        );
        let row = inner.memory.entry(key).or_insert_with(|| TranslationMemoryRow {
            src_lang: src_code.to_string(),
            trg_lang: Some(trg_code.to_string()),
            token: token.to_string(),
            translations: BTreeMap::new(),
            metadata,
        });
        row.translations
            .entry(translation.to_string())
            .or_insert(TranslationStats { frequency: 0 })
            .frequency += occurrences;
        Ok(())
    }

    async fn create_project(&self, mut project: ProjectRow) -> Result<ProjectRow> {
        let mut inner = self.lock()?;
        inner.next_project_id += 1;
        project.id = inner.next_project_id;
        inner.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn project(&self, project_id: i64) -> Result<Option<ProjectRow>> {
        Ok(self.lock()?.projects.get(&project_id).cloned())
    }

    async fn update_project(&self, project: &ProjectRow) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(())
            }
            None => Err(EngineError::NotAvailable(format!(
                "project with id, {}, not found",
                project.id
            ))),
        }
    }

    async fn projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRow>> {
        let inner = self.lock()?;
        let mut rows: Vec<ProjectRow> = inner
            .projects
            .values()
            .filter(|p| {
                filter.name.as_deref().map_or(true, |n| p.name == n)
                    && filter
                        .source_code
                        .as_deref()
                        .map_or(true, |c| p.source.code == c)
                    && filter
                        .target_code
                        .as_deref()
                        .map_or(true, |c| p.target.code == c)
                    && filter.active.map_or(true, |a| p.active == a)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.id);
        Ok(rows)
    }

    async fn insert_sentences(&self, rows: Vec<SentenceRow>) -> Result<()> {
        let mut inner = self.lock()?;
        for row in rows {
            inner
                .sentences
                .insert((row.project_id, row.sentence_id), row);
        }
        Ok(())
    }

    async fn sentences(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
    ) -> Result<Vec<SentenceRow>> {
        if let Some(books) = &selector.books {
            for code in books {
                if book_id(code).is_none() {
                    return Err(EngineError::NotAvailable(format!(
                        "book, {code}, not in database"
                    )));
                }
            }
        }
        let inner = self.lock()?;
        Ok(inner
            .sentences
            .range((project_id, i64::MIN)..=(project_id, i64::MAX))
            .filter(|((_, id), _)| selector_matches(selector, *id))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn sentence(&self, project_id: i64, sentence_id: i64) -> Result<Option<SentenceRow>> {
        Ok(self
            .lock()?
            .sentences
            .get(&(project_id, sentence_id))
            .cloned())
    }

    async fn save_sentence(&self, row: &SentenceRow) -> Result<i64> {
        let mut inner = self.lock()?;
        let slot = inner
            .sentences
            .get_mut(&(row.project_id, row.sentence_id))
            .ok_or_else(|| {
                EngineError::NotAvailable(format!(
                    "sentence id, {}, not found for the selected project",
                    row.sentence_id
                ))
            })?;
        if slot.version != row.version {
            return Err(EngineError::Conflict(format!(
                "sentence {} was updated concurrently (stored version {}, caller had {})",
                row.sentence_id, slot.version, row.version
            )));
        }
        let new_version = slot.version + 1;
        *slot = SentenceRow {
            version: new_version,
            ..row.clone()
        };
        Ok(new_version)
    }

    async fn bible_verses(&self, bible: &str, book_id: i64) -> Result<Vec<VerseRecord>> {
        if !bible.ends_with("_bible") {
            return Err(EngineError::TypeMismatch(
                "operation only supported on Bible tables".into(),
            ));
        }
        let inner = self.lock()?;
        let table = inner.bibles.get(bible).ok_or_else(|| {
            EngineError::NotAvailable(format!("bible, {bible}, not found"))
        })?;
        let start = book_id * 1_000_000;
        Ok(table
            .range(start..=start + 999_999)
            .map(|(_, verse)| verse.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(book_id: i64, chapter: i64, verse_num: i64, text: &str) -> VerseRecord {
        VerseRecord {
            book_code: super::super::models::book_code(book_id).unwrap().to_string(),
            book_id,
            chapter,
            verse: verse_num,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn save_sentence_enforces_versions() {
        let store = MemoryStore::new();
        let row = SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), "abc def".into());
        store.insert_sentences(vec![row.clone()]).await.unwrap();

        let v1 = store.save_sentence(&row).await.unwrap();
        assert_eq!(v1, 1);

        // a second writer holding the old version loses the race
        let err = store.save_sentence(&row).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let mut fresh = store.sentence(1, 1_001_001).await.unwrap().unwrap();
        fresh.draft = "xyz".into();
        assert_eq!(store.save_sentence(&fresh).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn add_translation_accumulates_frequency() {
        let store = MemoryStore::new();
        store
            .add_translation("hi", "en", "वचन", "word", 2)
            .await
            .unwrap();
        store
            .add_translation("hi", "en", "वचन", "word", 3)
            .await
            .unwrap();
        store
            .add_translation("hi", "en", "वचन", "speech", 1)
            .await
            .unwrap();
        let row = store.memory_row("hi", "en", "वचन").await.unwrap().unwrap();
        assert_eq!(row.translations["word"].frequency, 5);
        assert_eq!(row.translations["speech"].frequency, 1);
    }

    #[tokio::test]
    async fn bible_verse_lookup_checks_table_kind() {
        let store = MemoryStore::new();
        store
            .add_bible("hin_irv_1_bible", vec![verse(1, 1, 1, "पहला"), verse(2, 1, 1, "दूसरा")])
            .unwrap();

        let err = store.bible_verses("not_a_table", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch(_)));

        let verses = store.bible_verses("hin_irv_1_bible", 1).await.unwrap();
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].text, "पहला");
    }

    #[tokio::test]
    async fn sentence_selectors_filter_by_book_range_and_list() {
        let store = MemoryStore::new();
        store
            .insert_sentences(vec![
                SentenceRow::fresh(1, 1_001_001, "gen,1,1".into(), "a".into()),
                SentenceRow::fresh(1, 1_001_002, "gen,1,2".into(), "b".into()),
                SentenceRow::fresh(1, 2_001_001, "exo,1,1".into(), "c".into()),
            ])
            .await
            .unwrap();

        let by_book = store
            .sentences(1, &SentenceSelector::for_books(vec!["gen".into()]))
            .await
            .unwrap();
        assert_eq!(by_book.len(), 2);

        let by_range = store
            .sentences(
                1,
                &SentenceSelector {
                    id_range: Some((1_001_002, 2_001_001)),
                    ..SentenceSelector::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_range.len(), 2);

        let by_list = store
            .sentences(
                1,
                &SentenceSelector {
                    id_list: Some(vec![2_001_001]),
                    ..SentenceSelector::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_list.len(), 1);

        let unknown_book = store
            .sentences(1, &SentenceSelector::for_books(vec!["zzz".into()]))
            .await;
        assert!(matches!(unknown_book, Err(EngineError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn cross_target_metadata_seeds_new_rows() {
        let store = MemoryStore::new();
        {
            let mut inner = store.lock().unwrap();
            inner.memory.insert(
                ("hi".into(), "ta".into(), "वचन".into()),
                TranslationMemoryRow {
                    src_lang: "hi".into(),
                    trg_lang: Some("ta".into()),
                    token: "वचन".into(),
                    translations: BTreeMap::new(),
                    metadata: Some(serde_json::json!({"strongs": 3056})),
                },
            );
        }
        store
            .add_translation("hi", "en", "वचन", "word", 1)
            .await
            .unwrap();
        let row = store.memory_row("hi", "en", "वचन").await.unwrap().unwrap();
        assert_eq!(row.metadata, Some(serde_json::json!({"strongs": 3056})));
    }
}
