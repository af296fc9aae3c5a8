//! Context-sensitive suggestion lookup
//!
//! Lookup enumerates every key spelling for the token's observed context
//! and scores candidate translations found at or below each key. Deeper
//! keys describe more specific contexts, so a node's weight counts
//! level²-fold — a full `token/L:x/R:y` match outranks a bare `token`
//! match nine to one.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::suggestion::keys::{form_trie_keys, KeyMode};
use crate::suggestion::learner::SuggestionTrie;

/// A token reference for lookup: position in the context, or the word
/// itself (resolved to its first occurrence).
#[derive(Debug, Clone)]
pub enum LookupToken<'a> {
    Index(usize),
    Word(&'a str),
}

/// Rank candidate translations for a token in context.
///
/// Returns `(translation, score)` sorted by score descending; scores are
/// normalized to sum to 1. Empty when the trie knows nothing about the
/// token.
pub fn suggest_translations(
    token: LookupToken<'_>,
    context: &[String],
    trie: &SuggestionTrie,
) -> Result<Vec<(String, f64)>> {
    let (index, word) = match token {
        LookupToken::Index(index) => {
            let word = context.get(index).ok_or_else(|| {
                EngineError::MalformedInput(format!(
                    "token index {index} is outside a context of {} words",
                    context.len()
                ))
            })?;
            (index, word.as_str())
        }
        LookupToken::Word(word) => {
            let index = context
                .iter()
                .position(|w| w == word)
                .ok_or_else(|| {
                    EngineError::MalformedInput(format!(
                        "token, {word}, not present in its context window"
                    ))
                })?;
            (index, word)
        }
    };

    let to_left: Vec<String> = context[..index].iter().rev().cloned().collect();
    let to_right: Vec<String> = context[index + 1..].to_vec();
    let keys = form_trie_keys(word, &to_left, &to_right, KeyMode::All);

    let mut scores: HashMap<&str, f64> = HashMap::new();
    for key in &keys {
        let nodes = trie.subtree_values(key);
        if nodes.is_empty() {
            continue;
        }
        let level = key.split('/').count() as f64;
        for weights in nodes {
            for (translation, weight) in weights {
                *scores.entry(translation.as_str()).or_insert(0.0) += weight * level * level;
            }
        }
    }

    let total: f64 = scores.values().sum();
    if total <= 0.0 {
        return Ok(Vec::new());
    }
    let mut ranked: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(t, s)| (t.to_string(), s / total))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::learner::{build_trie, TokenRef, TrainingSample};

    fn ctx(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn sample(index: usize, context: &[&str], translation: &str) -> TrainingSample {
        TrainingSample {
            token: TokenRef::Index(index),
            context: ctx(context),
            translation: translation.to_string(),
        }
    }

    #[test]
    fn exact_context_match_returns_certainty() {
        let trie = build_trie(&[sample(1, &["a", "b", "c"], "B")]).unwrap();
        let ranked =
            suggest_translations(LookupToken::Index(1), &ctx(&["a", "b", "c"]), &trie).unwrap();
        assert_eq!(ranked, vec![("B".to_string(), 1.0)]);
    }

    #[test]
    fn unknown_token_returns_empty() {
        let trie = build_trie(&[sample(1, &["a", "b", "c"], "B")]).unwrap();
        let ranked =
            suggest_translations(LookupToken::Index(0), &ctx(&["z", "q"]), &trie).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn scores_sum_to_one_and_rank_by_context_fit() {
        // "b" translates to B1 in (a _ c) and B2 in (x _ y)
        let trie = build_trie(&[
            sample(1, &["a", "b", "c"], "B1"),
            sample(1, &["x", "b", "y"], "B2"),
        ])
        .unwrap();
        let ranked =
            suggest_translations(LookupToken::Word("b"), &ctx(&["a", "b", "c"]), &trie).unwrap();
        assert_eq!(ranked[0].0, "B1");
        let total: f64 = ranked.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn more_specific_context_does_not_lower_rank() {
        let trie = build_trie(&[
            sample(1, &["a", "b", "c"], "DEEP"),
            sample(0, &["b"], "SHALLOW"),
        ])
        .unwrap();
        // bare-token lookup sees both candidates
        let bare = suggest_translations(LookupToken::Index(0), &ctx(&["b"]), &trie).unwrap();
        let deep_rank_bare = bare.iter().position(|(t, _)| t == "DEEP");
        // full-context lookup must rank DEEP at least as high
        let full =
            suggest_translations(LookupToken::Index(1), &ctx(&["a", "b", "c"]), &trie).unwrap();
        let deep_rank_full = full.iter().position(|(t, _)| t == "DEEP").unwrap();
        assert_eq!(deep_rank_full, 0);
        if let Some(rank) = deep_rank_bare {
            assert!(deep_rank_full <= rank);
        }
    }

    #[test]
    fn deeper_keys_dominate_shallow_ones() {
        // SHALLOW has twice the raw frequency, but DEEP matches at level 3
        let trie = build_trie(&[
            sample(1, &["a", "b", "c"], "DEEP"),
            sample(0, &["b"], "SHALLOW"),
            sample(0, &["b"], "SHALLOW"),
        ])
        .unwrap();
        let ranked =
            suggest_translations(LookupToken::Index(1), &ctx(&["a", "b", "c"]), &trie).unwrap();
        assert_eq!(ranked[0].0, "DEEP");
    }

    #[test]
    fn phrase_tokens_look_up_like_words() {
        let trie = build_trie(&[TrainingSample {
            token: TokenRef::Index(1),
            context: ctx(&["x", "जीवन के वचन", "y"]),
            translation: "word of life".into(),
        }])
        .unwrap();
        let ranked = suggest_translations(
            LookupToken::Word("जीवन के वचन"),
            &ctx(&["x", "जीवन के वचन", "y"]),
            &trie,
        )
        .unwrap();
        assert_eq!(ranked[0].0, "word of life");
    }

    #[test]
    fn out_of_range_index_is_malformed_input() {
        let trie = SuggestionTrie::new();
        assert!(matches!(
            suggest_translations(LookupToken::Index(5), &ctx(&["a"]), &trie),
            Err(EngineError::MalformedInput(_))
        ));
    }
}
