//! Project lifecycle and the save-translations aggregator

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::draft::{progress_summary, replace_token, ProgressSummary, SegmentStatus};
use crate::error::{EngineError, Result};
use crate::export::{export_drafts, DocumentFormat, ExportOutput};
use crate::service::tokens::{TokenDetail, TokenService, TokenTranslation};
use crate::store::models::{
    book_id, ProjectMetadata, ProjectRow, SentenceRow, SentenceSelector, VerseRecord,
};
use crate::store::TranslationStore;
use crate::text::{normalize_unicode, Stopwords};
use crate::tokenizer::TokenizerOptions;
use crate::usfm;

/// Definition of a project to create.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub source_code: String,
    pub target_code: String,
    pub use_data_for_learning: bool,
    pub stopwords: Option<Stopwords>,
    pub punctuations: Option<Vec<char>>,
    pub active: bool,
}

/// Books to pull into a project from a stored Bible version.
#[derive(Debug, Clone)]
pub struct SelectedBooks {
    pub bible: String,
    pub books: Vec<String>,
}

/// Partial project update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub project_id: i64,
    pub active: Option<bool>,
    pub use_data_for_learning: Option<bool>,
    pub stopwords: Option<Stopwords>,
    pub punctuations: Option<Vec<char>>,
    pub selected_books: Option<SelectedBooks>,
    pub uploaded_usfm: Vec<String>,
}

/// Project management: creation, book loading, token listing, the
/// save-translations aggregator, progress, and export.
pub struct ProjectService<S> {
    store: Arc<S>,
    tokens: TokenService<S>,
}

impl<S: TranslationStore> ProjectService<S> {
    pub fn new(store: Arc<S>) -> Self {
        ProjectService {
            tokens: TokenService::new(Arc::clone(&store)),
            store,
        }
    }

    async fn require_project(&self, project_id: i64) -> Result<ProjectRow> {
        self.store.project(project_id).await?.ok_or_else(|| {
            EngineError::NotAvailable(format!("project with id, {project_id}, not found"))
        })
    }

    pub async fn create_project(&self, def: NewProject) -> Result<ProjectRow> {
        let source = self.store.language(&def.source_code).await?.ok_or_else(|| {
            EngineError::NotAvailable(format!(
                "language, {}, not present in DB",
                def.source_code
            ))
        })?;
        let target = self.store.language(&def.target_code).await?.ok_or_else(|| {
            EngineError::NotAvailable(format!(
                "language, {}, not present in DB",
                def.target_code
            ))
        })?;
        let project = ProjectRow {
            id: 0,
            name: normalize_unicode(&def.name),
            source,
            target,
            metadata: ProjectMetadata {
                books: Vec::new(),
                use_data_for_learning: def.use_data_for_learning,
                stopwords: def.stopwords,
                punctuations: def.punctuations,
            },
            active: def.active,
        };
        let created = self.store.create_project(project).await?;
        info!(project_id = created.id, name = %created.name, "created project");
        Ok(created)
    }

    /// Apply a partial update: toggle flags, replace tokenization
    /// overrides, and add books from a stored Bible or uploaded USFM.
    /// Every new verse becomes a fresh sentence.
    pub async fn update_project(&self, update: ProjectUpdate) -> Result<ProjectRow> {
        let mut project = self.require_project(update.project_id).await?;
        let mut new_books: Vec<String> = Vec::new();
        let mut new_rows: Vec<SentenceRow> = Vec::new();

        if let Some(selected) = &update.selected_books {
            for code in &selected.books {
                let id = book_id(code).ok_or_else(|| {
                    EngineError::NotAvailable(format!("book, {code}, not found in database"))
                })?;
                let verses = self.store.bible_verses(&selected.bible, id).await?;
                if verses.is_empty() {
                    return Err(EngineError::NotAvailable(format!(
                        "book, {code}, is empty for {}",
                        selected.bible
                    )));
                }
                new_books.push(code.clone());
                new_rows.extend(
                    verses
                        .into_iter()
                        .map(|verse| verse_row(project.id, verse)),
                );
            }
        }
        for source in &update.uploaded_usfm {
            let book = usfm::parse(source)?;
            new_books.push(book.book_code.clone());
            new_rows.extend(
                book.verses
                    .into_iter()
                    .map(|verse| verse_row(project.id, verse)),
            );
        }
        if !new_rows.is_empty() {
            let count = new_rows.len();
            self.store.insert_sentences(new_rows).await?;
            info!(project_id = project.id, sentences = count, "added book sentences");
        }

        if let Some(active) = update.active {
            project.active = active;
        }
        if let Some(use_data) = update.use_data_for_learning {
            project.metadata.use_data_for_learning = use_data;
        }
        if let Some(stopwords) = update.stopwords {
            project.metadata.stopwords = Some(stopwords);
        }
        if let Some(punctuations) = update.punctuations {
            project.metadata.punctuations = Some(punctuations);
        }
        project.metadata.books.extend(new_books);
        self.store.update_project(&project).await?;
        Ok(project)
    }

    /// Selected sentences of a project.
    pub async fn sentences(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
    ) -> Result<Vec<SentenceRow>> {
        self.require_project(project_id).await?;
        self.store.sentences(project_id, selector).await
    }

    /// Tokenize selected project sentences with the project's stopword and
    /// punctuation overrides applied.
    pub async fn tokens(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
        opts: &TokenizerOptions,
    ) -> Result<Vec<TokenDetail>> {
        let project = self.require_project(project_id).await?;
        let rows = self.store.sentences(project_id, selector).await?;
        let sentences: Vec<(i64, String)> = rows
            .into_iter()
            .map(|row| (row.sentence_id, row.sentence))
            .collect();
        let opts = project_options(&project, opts);
        self.tokens
            .generic_tokens(
                &project.source.code,
                Some(&project.target.code),
                &sentences,
                &opts,
            )
            .await
    }

    /// Apply confirmed token translations to project drafts and persist
    /// them, updating the translation memory when the project learns from
    /// its data. Returns the updated sentences sorted by id.
    pub async fn save_translations(
        &self,
        project_id: i64,
        token_translations: &[TokenTranslation],
    ) -> Result<Vec<SentenceRow>> {
        let project = self.require_project(project_id).await?;
        let use_data = project.metadata.use_data_for_learning;

        let mut touched: BTreeMap<i64, SentenceRow> = BTreeMap::new();
        for entry in token_translations {
            for occurrence in &entry.occurrences {
                if !touched.contains_key(&occurrence.sentence_id) {
                    let row = self
                        .store
                        .sentence(project_id, occurrence.sentence_id)
                        .await?
                        .ok_or_else(|| {
                            EngineError::NotAvailable(format!(
                                "sentence id, {}, not found for the selected project",
                                occurrence.sentence_id
                            ))
                        })?;
                    touched.insert(occurrence.sentence_id, row);
                }
                let row = touched
                    .get_mut(&occurrence.sentence_id)
                    .ok_or_else(|| EngineError::Store("sentence cache missing".into()))?;
                let (draft, meta) = replace_token(
                    &row.sentence,
                    occurrence.offset,
                    &entry.translation,
                    &row.draft,
                    &row.draft_meta,
                    SegmentStatus::Confirmed,
                )?;
                row.draft = draft;
                row.draft_meta = meta;
            }
            if use_data && !entry.occurrences.is_empty() {
                self.store
                    .add_translation(
                        &project.source.code,
                        &project.target.code,
                        &entry.token,
                        &entry.translation,
                        entry.occurrences.len() as u64,
                    )
                    .await?;
            }
        }

        let mut result = Vec::with_capacity(touched.len());
        for (_, mut row) in touched {
            row.version = self.store.save_sentence(&row).await?;
            result.push(row);
        }
        info!(project_id, sentences = result.len(), "saved confirmed translations");
        Ok(result)
    }

    /// Translation progress over the selected sentences.
    pub async fn progress(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
    ) -> Result<ProgressSummary> {
        self.require_project(project_id).await?;
        let rows = self.store.sentences(project_id, selector).await?;
        Ok(progress_summary(
            rows.iter()
                .map(|row| (row.sentence.as_str(), row.draft_meta.as_slice())),
        ))
    }

    /// Export selected drafts in the requested format.
    pub async fn draft(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
        format: DocumentFormat,
    ) -> Result<ExportOutput> {
        let project = self.require_project(project_id).await?;
        let rows = self.store.sentences(project_id, selector).await?;
        export_drafts(
            format,
            &rows,
            Some(&project.source),
            Some(&project.target),
            Some(Utc::now()),
        )
    }
}

fn verse_row(project_id: i64, verse: VerseRecord) -> SentenceRow {
    let sentence = normalize_unicode(&verse.text);
    SentenceRow::fresh(project_id, verse.ref_id(), verse.surrogate_id(), sentence)
}

/// Merge project-level stopword/punctuation overrides into request options
/// that did not set their own.
pub(crate) fn project_options(project: &ProjectRow, opts: &TokenizerOptions) -> TokenizerOptions {
    let mut merged = opts.clone();
    if merged.stopwords.is_none() {
        merged.stopwords = project.metadata.stopwords.clone();
    }
    if merged.punctuations.is_none() {
        merged.punctuations = project.metadata.punctuations.clone();
    }
    merged
}
