//! Rebuild suggestion-trie snapshots from on-disk training data
//!
//! Scans a directory of `<src>-<trg>.tsv` training files, builds one trie
//! per language pair, and writes `<src>-<trg>.json` snapshots. Meant to
//! run at startup and periodically; rebuilds are idempotent and snapshots
//! are written via temp file + rename, so an interrupted run never leaves
//! a torn model.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tm_engine::suggestion::{build_trie, cache::write_snapshot, read_training_rows};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <training-data-dir> <snapshot-dir>", args[0]);
        eprintln!("Example: {} models/suggestion_data models/suggestion_tries", args[0]);
        process::exit(1);
    }
    let data_dir = Path::new(&args[1]);
    let snapshot_dir = Path::new(&args[2]);

    let mut rebuilt = 0usize;
    for entry in fs::read_dir(data_dir)
        .with_context(|| format!("cannot read training data dir {}", data_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tsv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((src, trg)) = stem.split_once('-') else {
            warn!(file = %path.display(), "training file is not named <src>-<trg>.tsv, skipped");
            continue;
        };

        let (samples, report) = read_training_rows(&path)
            .with_context(|| format!("cannot read training rows from {}", path.display()))?;
        for skipped in &report.skipped {
            warn!(file = %path.display(), row = skipped.row, reason = %skipped.reason, "skipped training row");
        }
        let trie = build_trie(&samples)
            .with_context(|| format!("cannot build trie for {src}-{trg}"))?;

        let snapshot = snapshot_dir.join(format!("{src}-{trg}.json"));
        write_snapshot(&snapshot, &trie)
            .with_context(|| format!("cannot write snapshot {}", snapshot.display()))?;
        info!(
            pair = format!("{src}-{trg}"),
            samples = samples.len(),
            keys = trie.len(),
            snapshot = %snapshot.display(),
            "rebuilt suggestion trie"
        );
        rebuilt += 1;
    }
    info!(rebuilt, "trie rebuild complete");
    Ok(())
}
