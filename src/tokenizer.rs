//! Sentence tokenization into word and phrase units
//!
//! Tokenization pipeline per sentence:
//! 1. collapse newline runs to a space
//! 2. split into chunks at maximal runs of punctuation characters
//! 3. walk each chunk against the memory trie, greedily extracting the
//!    longest known phrases
//! 4. run the stopword phrase builder over the words the trie left behind
//! 5. locate every emitted phrase back in the original sentence to record
//!    byte offsets
//!
//! Offsets are byte offsets into the stored (NFC) sentence, so
//! `&sentence[start..end] == token` always holds for returned occurrences.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{EngineError, Result};
use crate::text::{self, Stopwords};
use crate::trie::StringTrie;

/// Trie over known source phrases. Values carry nothing; only key presence
/// matters during longest-match extraction.
pub type MemoryTrie = StringTrie<()>;

/// One location of a token inside a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOccurrence {
    pub sentence_id: i64,
    /// Byte offsets `[start, end)` into the sentence.
    pub offset: (usize, usize),
}

/// Tokenizer knobs. `stopwords`/`punctuations` fall back to the built-in
/// tables for the source language when not overridden.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub use_memory: bool,
    pub include_phrases: bool,
    pub include_stopwords: bool,
    pub punctuations: Option<Vec<char>>,
    pub stopwords: Option<Stopwords>,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            use_memory: true,
            include_phrases: true,
            include_stopwords: false,
            punctuations: None,
            stopwords: None,
        }
    }
}

/// Build a memory trie from known source-language tokens. Whitespace runs
/// inside multi-word tokens become the `/` label separator.
pub fn build_memory_trie<I, T>(tokens: I) -> MemoryTrie
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut trie = StringTrie::new();
    for token in tokens {
        let key: Vec<&str> = token.as_ref().split_whitespace().collect();
        if !key.is_empty() {
            trie.insert(&key.join("/"), ());
        }
    }
    trie
}

/// A chunk fragment after the memory-trie walk: either an exact phrase the
/// trie knew, or leftover words for the phrase builder.
enum Subchunk {
    Memory(String),
    Plain(String),
}

/// Tokenize sentences into ordered token occurrences.
///
/// Returns `token -> occurrences`, occurrences in sentence order. Fails
/// with `NotAvailable` when an emitted phrase cannot be located back in its
/// source sentence (inconsistent whitespace in the input).
pub fn tokenize(
    src_lang: &str,
    sentences: &[(i64, &str)],
    memory: Option<&MemoryTrie>,
    opts: &TokenizerOptions,
) -> Result<BTreeMap<String, Vec<TokenOccurrence>>> {
    let stop_words = match &opts.stopwords {
        Some(sw) => sw.clone(),
        None => text::stopwords(src_lang),
    };
    let puncts = match &opts.punctuations {
        Some(p) => p.clone(),
        None => text::default_punctuations(),
    };
    let newline_run = Regex::new(r"[\n\r]+").map_err(|e| {
        EngineError::MalformedInput(format!("newline pattern failed to compile: {e}"))
    })?;
    let punct_run = punct_class_regex(&puncts)?;
    let memory = if opts.use_memory { memory } else { None };

    let mut unique_tokens: BTreeMap<String, Vec<TokenOccurrence>> = BTreeMap::new();
    for &(sentence_id, sentence) in sentences {
        let text = newline_run.replace_all(sentence, " ");
        let chunks: Vec<&str> = punct_run.split(&text).map(str::trim).collect();

        let mut phrases: Vec<String> = Vec::new();
        for chunk in chunks {
            if chunk.is_empty() {
                continue;
            }
            for sub in split_on_memory(chunk, memory) {
                match sub {
                    Subchunk::Memory(phrase) => phrases.push(phrase),
                    Subchunk::Plain(words) => {
                        if opts.include_phrases {
                            phrases.extend(find_phrases(&words, &stop_words));
                        } else {
                            phrases.extend(words.split_whitespace().map(str::to_string));
                        }
                    }
                }
            }
        }

        let mut start = 0usize;
        for phrase in phrases {
            if phrase.is_empty() {
                continue;
            }
            if !opts.include_stopwords && stop_words.contains(&phrase) {
                continue;
            }
            let offset = sentence[start..].find(&phrase).map(|p| p + start).ok_or_else(|| {
                EngineError::NotAvailable(format!(
                    "tokenization: token, {phrase}, not found in sentence: {sentence}"
                ))
            })?;
            // Next search resumes one character past this match so repeated
            // phrases land on successive occurrences.
            start = offset
                + sentence[offset..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
            unique_tokens.entry(phrase.clone()).or_default().push(TokenOccurrence {
                sentence_id,
                offset: (offset, offset + phrase.len()),
            });
        }
    }
    Ok(unique_tokens)
}

/// Compile a regex matching maximal runs of the given characters.
fn punct_class_regex(puncts: &[char]) -> Result<Regex> {
    let class: String = puncts
        .iter()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    Regex::new(&format!("[{class}]+"))
        .map_err(|e| EngineError::MalformedInput(format!("invalid punctuation class: {e}")))
}

/// Walk a chunk left to right against the memory trie, emitting the longest
/// known phrase at each position and buffering unknown words in between.
fn split_on_memory(chunk: &str, memory: Option<&MemoryTrie>) -> Vec<Subchunk> {
    let memory = match memory {
        Some(m) if !m.is_empty() => m,
        _ => return vec![Subchunk::Plain(chunk.to_string())],
    };
    let words: Vec<&str> = chunk.split_whitespace().collect();
    let mut out = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let key = words[i..].join("/");
        match memory.longest_prefix(&key) {
            Some((matched, _)) => {
                let matched_words = matched.split('/').count();
                if !buffer.is_empty() {
                    out.push(Subchunk::Plain(buffer.join(" ")));
                    buffer.clear();
                }
                out.push(Subchunk::Memory(
                    words[i..i + matched_words].join(" "),
                ));
                i += matched_words;
            }
            None => {
                buffer.push(words[i]);
                i += 1;
            }
        }
    }
    if !buffer.is_empty() {
        out.push(Subchunk::Plain(buffer.join(" ")));
    }
    out
}

#[derive(Clone, Copy, PartialEq)]
enum PhraseState {
    /// Collecting leading stopwords, waiting for a content word.
    Pre,
    /// Content word seen; trailing postpositions may still attach.
    Post,
}

/// Group the words of a chunk into phrases shaped
/// `<stopword>* <content word> <postposition>*`.
///
/// Stopwords never stand alone: a phrase only breaks between two content
/// words. A preposition after a content word re-opens the phrase for the
/// next content word, which is how halos like "जीवन के वचन को" stay whole.
pub(crate) fn find_phrases(text: &str, stop_words: &Stopwords) -> Vec<String> {
    let mut phrases = Vec::new();
    let mut current = String::new();
    let mut state = PhraseState::Pre;
    for word in text.split_whitespace() {
        match state {
            PhraseState::Pre => {
                push_word(&mut current, word);
                if !stop_words.contains(word) {
                    state = PhraseState::Post;
                }
            }
            PhraseState::Post => {
                if stop_words.postpositions.contains(word) {
                    push_word(&mut current, word);
                } else if stop_words.prepositions.contains(word) {
                    push_word(&mut current, word);
                    state = PhraseState::Pre;
                } else {
                    phrases.push(std::mem::take(&mut current));
                    current.push_str(word);
                }
            }
        }
    }
    if !current.is_empty() {
        phrases.push(current);
    }
    phrases
}

fn push_word(buffer: &mut String, word: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(word);
}
