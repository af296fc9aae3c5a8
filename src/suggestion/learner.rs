//! Suggestion-trie learning from confirmed translations
//!
//! Each training sample is `(token, context, translation)`. Learning
//! enumerates the longest context keys for the sample and spreads one unit
//! of weight evenly across them, so a translation observed in a specific
//! context counts the same regardless of how many equivalent key spellings
//! that context has.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::extract_context;
use crate::draft::{Segment, SegmentStatus};
use crate::error::{EngineError, Result};
use crate::suggestion::keys::{form_trie_keys, KeyMode};
use crate::trie::StringTrie;

/// Candidate translations and their accumulated weights at one trie node.
pub type TranslationWeights = BTreeMap<String, f64>;

/// The learned model: context keys mapping to weighted translations.
pub type SuggestionTrie = StringTrie<TranslationWeights>;

/// A token reference inside a training sample: either its position in the
/// context window or the token text itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRef {
    Index(usize),
    Word(String),
}

/// One unit of training data.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub token: TokenRef,
    pub context: Vec<String>,
    pub translation: String,
}

impl TrainingSample {
    /// Resolve the sample to `(index, token)` within its context.
    fn resolve(&self) -> Result<(usize, &str)> {
        match &self.token {
            TokenRef::Index(index) => {
                let token = self.context.get(*index).ok_or_else(|| {
                    EngineError::MalformedInput(format!(
                        "token index {index} is outside a context of {} words",
                        self.context.len()
                    ))
                })?;
                Ok((*index, token))
            }
            TokenRef::Word(word) => {
                let index = self
                    .context
                    .iter()
                    .position(|w| w == word)
                    .ok_or_else(|| {
                        EngineError::MalformedInput(format!(
                            "token, {word}, not present in its context window"
                        ))
                    })?;
                Ok((index, word))
            }
        }
    }
}

/// Build a suggestion trie from training samples.
pub fn build_trie<'a, I>(samples: I) -> Result<SuggestionTrie>
where
    I: IntoIterator<Item = &'a TrainingSample>,
{
    let mut trie = SuggestionTrie::new();
    for sample in samples {
        let (index, token) = sample.resolve()?;
        let to_left: Vec<String> = sample.context[..index].iter().rev().cloned().collect();
        let to_right: Vec<String> = sample.context[index + 1..].to_vec();
        let keys = form_trie_keys(token, &to_left, &to_right, KeyMode::LongestOnly);
        let share = 1.0 / keys.len() as f64;
        for key in keys {
            match trie.get_mut(&key) {
                Some(weights) => {
                    *weights.entry(sample.translation.clone()).or_insert(0.0) += share;
                }
                None => {
                    let mut weights = TranslationWeights::new();
                    weights.insert(sample.translation.clone(), share);
                    trie.insert(&key, weights);
                }
            }
        }
    }
    Ok(trie)
}

/// Extract training samples from the confirmed segments of drafted
/// sentences. The token is the source slice of the segment, its
/// translation the draft slice.
pub fn training_data_from_drafts<'a, I>(
    rows: I,
    window_size: usize,
    puncts: &[char],
) -> Vec<TrainingSample>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a [Segment])>,
{
    let mut samples = Vec::new();
    for (sentence, draft, meta) in rows {
        for seg in meta {
            if seg.status != SegmentStatus::Confirmed {
                continue;
            }
            let (Some(token), Some(translation)) = (
                sentence.get(seg.src.0..seg.src.1),
                draft.get(seg.dst.0..seg.dst.1),
            ) else {
                continue;
            };
            if token.is_empty() || translation.is_empty() {
                continue;
            }
            let (index, context) =
                extract_context(token, seg.src, sentence, window_size, puncts);
            samples.push(TrainingSample {
                token: TokenRef::Index(index),
                context,
                translation: translation.to_string(),
            });
        }
    }
    samples
}

// =============================================================================
// ALIGNMENT INGESTION
// =============================================================================

/// A sentence pair with word alignments, as produced by external aligners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedSentence {
    pub source_tokens: Vec<String>,
    pub target_tokens: Vec<String>,
    /// `(source index, target index)` pairs.
    pub aligned: Vec<(usize, usize)>,
}

/// One rejected row in a bulk ingestion, with the reason it was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

/// Outcome of a bulk ingestion: accepted count plus per-row rejections.
/// A bad row never aborts the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: Vec<RowError>,
}

/// Convert aligned sentence pairs into training samples.
///
/// Only one-to-one alignments are converted: a pair that re-visits a source
/// or target index belongs to a multi-word fragment and is reported as
/// skipped rather than merged.
pub fn alignments_to_training(
    sentences: &[AlignedSentence],
    window_size: usize,
) -> (Vec<TrainingSample>, IngestReport) {
    let mut samples = Vec::new();
    let mut report = IngestReport::default();
    let mut row = 0usize;
    for sent in sentences {
        let mut seen_src: Vec<usize> = Vec::new();
        let mut seen_trg: Vec<usize> = Vec::new();
        for &(src_idx, trg_idx) in &sent.aligned {
            row += 1;
            if src_idx >= sent.source_tokens.len() || trg_idx >= sent.target_tokens.len() {
                report.skipped.push(RowError {
                    row,
                    reason: format!("alignment ({src_idx}, {trg_idx}) is out of range"),
                });
                continue;
            }
            if seen_src.contains(&src_idx) || seen_trg.contains(&trg_idx) {
                report.skipped.push(RowError {
                    row,
                    reason: format!(
                        "alignment ({src_idx}, {trg_idx}) re-visits an aligned token (multi-word fragment)"
                    ),
                });
                continue;
            }
            seen_src.push(src_idx);
            seen_trg.push(trg_idx);

            let window_start = src_idx.saturating_sub(window_size / 2);
            let window_end = (src_idx + window_size.div_ceil(2)).min(sent.source_tokens.len());
            samples.push(TrainingSample {
                token: TokenRef::Index(src_idx - window_start),
                context: sent.source_tokens[window_start..window_end].to_vec(),
                translation: sent.target_tokens[trg_idx].clone(),
            });
            report.accepted += 1;
        }
    }
    (samples, report)
}

// =============================================================================
// TRAINING TSV
// =============================================================================

/// Append or rewrite training rows at `path`. Columns are
/// `token-or-index \t context-json \t translation`.
pub fn write_training_rows(path: &Path, samples: &[TrainingSample], append: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(append)
        .write(true)
        .truncate(!append)
        .open(path)?;
    for sample in samples {
        let token_cell = match &sample.token {
            TokenRef::Index(i) => i.to_string(),
            TokenRef::Word(w) => w.clone(),
        };
        let context_cell = serde_json::to_string(&sample.context)?;
        writeln!(file, "{token_cell}\t{context_cell}\t{}", sample.translation)?;
    }
    Ok(())
}

/// Read training rows from a TSV file. Malformed rows are reported and
/// skipped; they never fail the whole read.
pub fn read_training_rows(path: &Path) -> Result<(Vec<TrainingSample>, IngestReport)> {
    let content = fs::read_to_string(path)?;
    let mut samples = Vec::new();
    let mut report = IngestReport::default();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line_no + 1;
        let mut fields = line.splitn(3, '\t');
        let (Some(token_cell), Some(context_cell), Some(translation)) =
            (fields.next(), fields.next(), fields.next())
        else {
            warn!(row, "training row has fewer than 3 tab-separated fields");
            report.skipped.push(RowError {
                row,
                reason: "expected 3 tab-separated fields".into(),
            });
            continue;
        };
        let context: Vec<String> = match serde_json::from_str(context_cell) {
            Ok(context) => context,
            Err(err) => {
                warn!(row, %err, "training row has an invalid context cell");
                report.skipped.push(RowError {
                    row,
                    reason: format!("invalid context JSON: {err}"),
                });
                continue;
            }
        };
        let token = match token_cell.parse::<usize>() {
            Ok(index) => TokenRef::Index(index),
            Err(_) => TokenRef::Word(token_cell.to_string()),
        };
        samples.push(TrainingSample {
            token,
            context,
            translation: translation.to_string(),
        });
        report.accepted += 1;
    }
    Ok((samples, report))
}
