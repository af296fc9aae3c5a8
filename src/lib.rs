//! tm-engine: translation-memory drafting for Bible translation projects
//!
//! The engine turns source sentences plus a growing body of confirmed
//! human translations into drafting assistance:
//!
//! - [`tokenizer`] splits sentences into word and phrase units using
//!   stopword heuristics and a trie of known phrases
//! - [`draft`] keeps every sentence's draft aligned to its source through
//!   a segment map, and splices token replacements into it
//! - [`suggestion`] learns a context-sensitive translation model as a
//!   prefix tree and ranks candidates for a token in context
//! - [`service`] composes the three over a [`store`] backend: confirm
//!   translations, auto-fill drafts, track progress, export
//!
//! The flow is a loop: tokenization feeds the splicer when a user confirms
//! a translation, confirmed segments feed the learner, and the learned
//! trie feeds the auto-translate path that fills the remaining segments
//! with suggestions.

pub mod context;
pub mod draft;
pub mod error;
pub mod export;
pub mod service;
pub mod store;
pub mod suggestion;
pub mod text;
pub mod tokenizer;
pub mod trie;
pub mod usfm;

pub use draft::{
    check_meta_coverage, confirm_suggestions, progress_summary, replace_token, ProgressSummary,
    Segment, SegmentStatus,
};
pub use error::{EngineError, Result};
pub use export::{export_drafts, DocumentFormat, ExportOutput};
pub use service::{
    NewProject, ProjectService, ProjectUpdate, RebuildSummary, SelectedBooks, SuggestionService,
    TokenDetail, TokenService, TokenTranslation,
};
pub use store::models::{
    Language, ProjectRow, SentenceRow, SentenceSelector, TranslationMemoryRow, VerseRecord,
};
pub use store::TranslationStore;
pub use suggestion::{LangPair, SuggestionCache};
pub use tokenizer::{build_memory_trie, tokenize, TokenOccurrence, TokenizerOptions};
