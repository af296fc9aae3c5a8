//! Auto-translation and suggestion-model maintenance

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::extract_context;
use crate::draft::{confirm_suggestions, replace_token, Segment, SegmentStatus};
use crate::error::{EngineError, Result};
use crate::service::projects::project_options;
use crate::store::models::{ProjectFilter, ProjectRow, SentenceRow, SentenceSelector};
use crate::store::TranslationStore;
use crate::suggestion::{
    alignments_to_training, build_trie, read_training_rows, suggest_translations,
    training_data_from_drafts, write_training_rows, AlignedSentence, IngestReport, LangPair,
    LookupToken, SuggestionCache, TrainingSample, WINDOW_SIZE,
};
use crate::text;
use crate::tokenizer::{build_memory_trie, tokenize, TokenizerOptions};

/// Counts from one suggestion-trie rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub samples: usize,
    pub keys: usize,
}

/// Fills drafts with ranked suggestions and maintains the per-pair
/// suggestion tries.
pub struct SuggestionService<S> {
    store: Arc<S>,
    cache: Arc<SuggestionCache>,
    /// Directory of `<src>-<trg>.tsv` training files.
    data_dir: PathBuf,
    window_size: usize,
}

impl<S: TranslationStore> SuggestionService<S> {
    pub fn new(store: Arc<S>, cache: Arc<SuggestionCache>, data_dir: impl Into<PathBuf>) -> Self {
        SuggestionService {
            store,
            cache,
            data_dir: data_dir.into(),
            window_size: WINDOW_SIZE,
        }
    }

    async fn require_project(&self, project_id: i64) -> Result<ProjectRow> {
        self.store.project(project_id).await?.ok_or_else(|| {
            EngineError::NotAvailable(format!("project with id, {project_id}, not found"))
        })
    }

    /// Tokenize each sentence and splice the top-ranked suggestion over
    /// every occurrence the model knows something about. Confirmed
    /// segments are never touched. Returns the ids of changed sentences.
    pub async fn auto_translate(
        &self,
        rows: &mut [SentenceRow],
        project: &ProjectRow,
        opts: &TokenizerOptions,
    ) -> Result<Vec<i64>> {
        let pair = LangPair::new(&project.source.code, &project.target.code);
        let trie = self.cache.get(&pair)?;
        let opts = TokenizerOptions {
            include_stopwords: true,
            ..project_options(project, opts)
        };
        let memory = if opts.use_memory {
            Some(build_memory_trie(
                self.store.memory_tokens(&project.source.code).await?,
            ))
        } else {
            None
        };
        let puncts = opts
            .punctuations
            .clone()
            .unwrap_or_else(text::default_punctuations);

        let mut changed: Vec<i64> = Vec::new();
        for row in rows.iter_mut() {
            let sentence_refs = [(row.sentence_id, row.sentence.as_str())];
            let tokens = tokenize(&project.source.code, &sentence_refs, memory.as_ref(), &opts)?;
            let mut dirty = false;
            for (token, occurrences) in &tokens {
                for occurrence in occurrences {
                    match segment_containing(&row.draft_meta, occurrence.offset) {
                        SegmentHit::Confirmed => continue,
                        SegmentHit::Spanning => {
                            debug!(
                                sentence_id = row.sentence_id,
                                token = %token,
                                "occurrence crosses a segment boundary, skipped"
                            );
                            continue;
                        }
                        SegmentHit::Editable => {}
                    }
                    let (index, context) = extract_context(
                        token,
                        occurrence.offset,
                        &row.sentence,
                        self.window_size,
                        &puncts,
                    );
                    let ranked = suggest_translations(LookupToken::Index(index), &context, &trie)?;
                    if let Some((best, _)) = ranked.first() {
                        let (draft, meta) = replace_token(
                            &row.sentence,
                            occurrence.offset,
                            best,
                            &row.draft,
                            &row.draft_meta,
                            SegmentStatus::Suggestion,
                        )?;
                        row.draft = draft;
                        row.draft_meta = meta;
                        dirty = true;
                    } else if row.draft.is_empty() {
                        row.draft = row.sentence.clone();
                        row.draft_meta = crate::draft::fresh_meta(&row.sentence);
                        dirty = true;
                    }
                }
            }
            if dirty {
                changed.push(row.sentence_id);
            }
        }
        Ok(changed)
    }

    /// Fill the selected project drafts with suggestions and persist them.
    /// With `confirm_all`, existing suggestions are retagged `Confirmed`
    /// instead and no new suggestions are made.
    pub async fn suggest_translations(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
        confirm_all: bool,
    ) -> Result<Vec<SentenceRow>> {
        let project = self.require_project(project_id).await?;
        let mut rows = self.store.sentences(project_id, selector).await?;

        if confirm_all {
            for row in rows.iter_mut() {
                if confirm_suggestions(&mut row.draft_meta) > 0 {
                    row.version = self.store.save_sentence(row).await?;
                }
            }
            return Ok(rows);
        }

        let changed = self
            .auto_translate(&mut rows, &project, &TokenizerOptions::default())
            .await?;
        for row in rows.iter_mut() {
            if changed.contains(&row.sentence_id) {
                row.version = self.store.save_sentence(row).await?;
            }
        }
        info!(project_id, changed = changed.len(), "auto-translated drafts");
        Ok(rows)
    }

    /// Append alignment-derived training rows to the pair's TSV file.
    /// Returns the per-row ingest report; multi-word fragments and
    /// out-of-range pairs are skipped, never fatal.
    pub fn ingest_alignments(
        &self,
        src_code: &str,
        trg_code: &str,
        sentences: &[AlignedSentence],
        append: bool,
    ) -> Result<IngestReport> {
        let (samples, report) = alignments_to_training(sentences, self.window_size);
        let path = self
            .data_dir
            .join(format!("{}.tsv", LangPair::new(src_code, trg_code)));
        write_training_rows(&path, &samples, append)?;
        info!(
            src = src_code,
            trg = trg_code,
            accepted = report.accepted,
            skipped = report.skipped.len(),
            "ingested alignment training data"
        );
        Ok(report)
    }

    /// Rebuild the suggestion trie for a language pair from its on-disk
    /// training rows plus the confirmed segments of every learning
    /// project, then swap it into the cache.
    pub async fn rebuild_pair(&self, src_code: &str, trg_code: &str) -> Result<RebuildSummary> {
        let pair = LangPair::new(src_code, trg_code);
        let mut samples: Vec<TrainingSample> = Vec::new();

        let tsv_path = self.data_dir.join(format!("{pair}.tsv"));
        if tsv_path.exists() {
            let (rows, report) = read_training_rows(&tsv_path)?;
            if !report.skipped.is_empty() {
                debug!(
                    path = %tsv_path.display(),
                    skipped = report.skipped.len(),
                    "training file had malformed rows"
                );
            }
            samples.extend(rows);
        }

        let projects = self
            .store
            .projects(&ProjectFilter {
                source_code: Some(src_code.to_string()),
                target_code: Some(trg_code.to_string()),
                active: Some(true),
                ..ProjectFilter::default()
            })
            .await?;
        let puncts = text::default_punctuations();
        for project in projects {
            if !project.metadata.use_data_for_learning {
                continue;
            }
            let rows = self
                .store
                .sentences(project.id, &SentenceSelector::all())
                .await?;
            samples.extend(training_data_from_drafts(
                rows.iter()
                    .map(|row| (row.sentence.as_str(), row.draft.as_str(), row.draft_meta.as_slice())),
                self.window_size,
                &puncts,
            ));
        }

        let trie = build_trie(&samples)?;
        let keys = trie.len();
        self.cache.install(&pair, trie)?;
        Ok(RebuildSummary {
            samples: samples.len(),
            keys,
        })
    }
}

enum SegmentHit {
    /// The offset sits inside an editable segment (or the meta is empty,
    /// which seeds a fresh one).
    Editable,
    /// The offset sits inside a confirmed segment.
    Confirmed,
    /// The offset crosses segment boundaries.
    Spanning,
}

fn segment_containing(meta: &[Segment], offset: (usize, usize)) -> SegmentHit {
    if meta.is_empty() {
        return SegmentHit::Editable;
    }
    for seg in meta {
        if seg.src.0 <= offset.0 && offset.1 <= seg.src.1 {
            return match seg.status {
                SegmentStatus::Confirmed => SegmentHit::Confirmed,
                _ => SegmentHit::Editable,
            };
        }
        // any overlap that is not containment crosses a boundary
        if offset.0.max(seg.src.0) < offset.1.min(seg.src.1) {
            return SegmentHit::Spanning;
        }
    }
    SegmentHit::Spanning
}
