//! Context-sensitive translation suggestions
//!
//! The suggestion model is a prefix tree over context keys
//! (`token[/L:w]…[/R:w]…`) mapping to weighted candidate translations.
//! [`learner`] builds it from confirmed draft segments and on-disk training
//! rows, [`lookup`] scores candidates for a token in context, and
//! [`cache`] keeps one immutable trie per language pair with atomic
//! snapshot swaps.

pub mod cache;
pub mod keys;
pub mod learner;
pub mod lookup;

pub use cache::{LangPair, SuggestionCache};
pub use keys::{form_trie_keys, KeyMode};
pub use learner::{
    alignments_to_training, build_trie, read_training_rows, training_data_from_drafts,
    write_training_rows, AlignedSentence, IngestReport, RowError, SuggestionTrie, TokenRef,
    TrainingSample, TranslationWeights,
};
pub use lookup::{suggest_translations, LookupToken};

/// Context window width used when none is configured: two words to the
/// left, the token, and up to three words to the right.
pub const WINDOW_SIZE: usize = 5;
