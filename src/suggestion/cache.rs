//! Process-wide suggestion-trie cache and on-disk snapshots
//!
//! One trie per language pair, loaded lazily from its JSON snapshot on
//! first lookup and swapped atomically after a rebuild. Readers clone the
//! `Arc` out of the map, so an in-flight auto-translate keeps a consistent
//! trie even while a rebuild replaces it.
//!
//! Snapshot files live at `<dir>/<src>-<trg>.json` and map key strings to
//! `{translation: weight}` objects. Writes go to a temp path first and are
//! renamed into place, so a crashed rebuild never leaves a torn snapshot.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::suggestion::learner::{SuggestionTrie, TranslationWeights};

/// A source→target language pair, the cache and snapshot key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LangPair {
    pub src: String,
    pub trg: String,
}

impl LangPair {
    pub fn new(src: &str, trg: &str) -> Self {
        LangPair {
            src: src.to_string(),
            trg: trg.to_string(),
        }
    }
}

impl fmt::Display for LangPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.src, self.trg)
    }
}

/// Shared cache of learned tries keyed by language pair.
pub struct SuggestionCache {
    tries: RwLock<HashMap<LangPair, Arc<SuggestionTrie>>>,
    snapshot_dir: PathBuf,
}

impl SuggestionCache {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        SuggestionCache {
            tries: RwLock::new(HashMap::new()),
            snapshot_dir: snapshot_dir.into(),
        }
    }

    pub fn snapshot_path(&self, pair: &LangPair) -> PathBuf {
        self.snapshot_dir.join(format!("{pair}.json"))
    }

    /// Get the trie for a pair: from memory, else from its disk snapshot,
    /// else an empty trie. The result is cached either way so repeated
    /// lookups stay cheap.
    pub fn get(&self, pair: &LangPair) -> Result<Arc<SuggestionTrie>> {
        if let Some(trie) = self
            .tries
            .read()
            .map_err(|_| EngineError::Store("suggestion cache lock poisoned".into()))?
            .get(pair)
        {
            return Ok(Arc::clone(trie));
        }

        let path = self.snapshot_path(pair);
        let trie = if path.exists() {
            let trie = load_snapshot(&path)?;
            debug!(pair = %pair, keys = trie.len(), "loaded suggestion trie snapshot");
            trie
        } else {
            SuggestionTrie::new()
        };
        let trie = Arc::new(trie);
        let mut guard = self
            .tries
            .write()
            .map_err(|_| EngineError::Store("suggestion cache lock poisoned".into()))?;
        let entry = guard.entry(pair.clone()).or_insert_with(|| Arc::clone(&trie));
        Ok(Arc::clone(entry))
    }

    /// Persist a freshly built trie and swap it into the cache. The
    /// snapshot hits disk before readers can observe the new trie.
    pub fn install(&self, pair: &LangPair, trie: SuggestionTrie) -> Result<Arc<SuggestionTrie>> {
        write_snapshot(&self.snapshot_path(pair), &trie)?;
        let trie = Arc::new(trie);
        let mut guard = self
            .tries
            .write()
            .map_err(|_| EngineError::Store("suggestion cache lock poisoned".into()))?;
        guard.insert(pair.clone(), Arc::clone(&trie));
        info!(pair = %pair, keys = trie.len(), "installed rebuilt suggestion trie");
        Ok(trie)
    }
}

/// Load a trie from its JSON snapshot.
pub fn load_snapshot(path: &Path) -> Result<SuggestionTrie> {
    let content = fs::read_to_string(path)?;
    let entries: BTreeMap<String, TranslationWeights> = serde_json::from_str(&content)?;
    let mut trie = SuggestionTrie::new();
    for (key, weights) in entries {
        trie.insert(&key, weights);
    }
    Ok(trie)
}

/// Write a trie snapshot to `path` via a temp file and rename.
pub fn write_snapshot(path: &Path, trie: &SuggestionTrie) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // sorted map for stable snapshot output
    let sorted: BTreeMap<String, &TranslationWeights> = trie.entries().into_iter().collect();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string(&sorted)?)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), keys = sorted.len(), "wrote suggestion trie snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::learner::{build_trie, TokenRef, TrainingSample};

    fn sample_trie() -> SuggestionTrie {
        build_trie(&[TrainingSample {
            token: TokenRef::Index(1),
            context: vec!["a".into(), "b".into(), "c".into()],
            translation: "B".into(),
        }])
        .unwrap()
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hi-en.json");
        let trie = sample_trie();
        write_snapshot(&path, &trie).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.len(), trie.len());
        assert_eq!(loaded.get("b/L:a/R:c").unwrap().get("B"), Some(&0.5));
    }

    #[test]
    fn cache_misses_fall_back_to_empty_trie() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SuggestionCache::new(dir.path());
        let trie = cache.get(&LangPair::new("xx", "yy")).unwrap();
        assert!(trie.is_empty());
    }

    #[test]
    fn install_swaps_the_cached_trie_and_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SuggestionCache::new(dir.path());
        let pair = LangPair::new("hi", "en");

        let before = cache.get(&pair).unwrap();
        assert!(before.is_empty());

        cache.install(&pair, sample_trie()).unwrap();
        let after = cache.get(&pair).unwrap();
        assert_eq!(after.len(), 2);
        assert!(cache.snapshot_path(&pair).exists());

        // the old Arc still reads consistently
        assert!(before.is_empty());
    }

    #[test]
    fn lazy_load_reads_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let pair = LangPair::new("hi", "en");
        let path = dir.path().join("hi-en.json");
        write_snapshot(&path, &sample_trie()).unwrap();

        let cache = SuggestionCache::new(dir.path());
        let trie = cache.get(&pair).unwrap();
        assert_eq!(trie.len(), 2);
    }
}
