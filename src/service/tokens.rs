//! Token extraction and bulk replacement services

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::draft::{replace_token, SegmentStatus};
use crate::error::{EngineError, Result};
use crate::store::models::{Language, SentenceRow, TranslationStats};
use crate::store::TranslationStore;
use crate::tokenizer::{build_memory_trie, tokenize, TokenOccurrence, TokenizerOptions};

/// A token with its occurrences and what the translation memory already
/// knows about it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDetail {
    pub token: String,
    pub occurrences: Vec<TokenOccurrence>,
    pub translations: BTreeMap<String, TranslationStats>,
    pub metadata: Option<serde_json::Value>,
}

/// A translation to apply to every listed occurrence of a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTranslation {
    pub token: String,
    pub translation: String,
    pub occurrences: Vec<TokenOccurrence>,
}

/// Tokenization and bulk-replacement over any sentence list.
pub struct TokenService<S> {
    store: Arc<S>,
}

impl<S: TranslationStore> TokenService<S> {
    pub fn new(store: Arc<S>) -> Self {
        TokenService { store }
    }

    async fn require_language(&self, code: &str) -> Result<Language> {
        self.store.language(code).await?.ok_or_else(|| {
            EngineError::NotAvailable(format!("language, {code}, not present in DB"))
        })
    }

    /// Tokenize `sentences` and attach known translations for each token.
    ///
    /// When a target language is given, each token carries the memory
    /// row's translations for that pair; cross-target metadata is attached
    /// either way.
    pub async fn generic_tokens(
        &self,
        src_code: &str,
        trg_code: Option<&str>,
        sentences: &[(i64, String)],
        opts: &TokenizerOptions,
    ) -> Result<Vec<TokenDetail>> {
        let source = self.require_language(src_code).await?;
        let target = match trg_code {
            Some(code) => Some(self.require_language(code).await?),
            None => None,
        };

        let memory = if opts.use_memory {
            Some(build_memory_trie(
                self.store.memory_tokens(&source.code).await?,
            ))
        } else {
            None
        };
        let sentence_refs: Vec<(i64, &str)> = sentences
            .iter()
            .map(|(id, text)| (*id, text.as_str()))
            .collect();
        let tokens = tokenize(&source.code, &sentence_refs, memory.as_ref(), opts)?;

        let mut result = Vec::with_capacity(tokens.len());
        for (token, occurrences) in tokens {
            let mut detail = TokenDetail {
                token: token.clone(),
                occurrences,
                translations: BTreeMap::new(),
                metadata: None,
            };
            if let Some(target) = &target {
                if let Some(row) = self
                    .store
                    .memory_row(&source.code, &target.code, &token)
                    .await?
                {
                    detail.translations = row.translations;
                    detail.metadata = row.metadata;
                }
            }
            if detail.metadata.is_none() {
                detail.metadata = self
                    .store
                    .cross_target_metadata(&source.code, &token)
                    .await?;
            }
            result.push(detail);
        }
        Ok(result)
    }

    /// Apply token translations to caller-held sentences, tagging the
    /// spliced segments `Confirmed`. Drafts are returned, not persisted;
    /// when `use_data` is set the translation memory is updated.
    pub async fn replace_bulk_tokens(
        &self,
        mut sentences: Vec<SentenceRow>,
        token_translations: &[TokenTranslation],
        src_code: &str,
        trg_code: &str,
        use_data: bool,
    ) -> Result<Vec<SentenceRow>> {
        let source = self.require_language(src_code).await?;
        let target = self.require_language(trg_code).await?;

        for entry in token_translations {
            for occurrence in &entry.occurrences {
                let row = sentences
                    .iter_mut()
                    .find(|row| row.sentence_id == occurrence.sentence_id)
                    .ok_or_else(|| {
                        EngineError::NotAvailable(format!(
                            "sentence id, {}, not found in the sentence list",
                            occurrence.sentence_id
                        ))
                    })?;
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
                        &source.code,
                        &target.code,
                        &entry.token,
                        &entry.translation,
                        entry.occurrences.len() as u64,
                    )
                    .await?;
                debug!(token = %entry.token, translation = %entry.translation, "memory updated");
            }
        }
        Ok(sentences)
    }
}
