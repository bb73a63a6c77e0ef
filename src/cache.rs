//! Persistent compilation cache.
//!
//! Maps each content file's absolute path to its last compilation result
//! and the mtime fingerprint the result was produced from. An entry is
//! valid exactly as long as the fingerprint matches the file on disk, so
//! unchanged files are served from the cache and changed files are never.
//!
//! The store is one JSON file, loaded at process start and saved at the
//! end of every generation pass. It is owned by whoever drives the passes
//! and handed down by reference; nothing else holds onto it.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use crate::log;

/// One cached compilation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint of the source file the entry was computed from.
    pub hash: String,
    /// Document type the entry belongs to.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The compiled document data, as written to the per-document artifact.
    pub document: Value,
}

/// Persistent path-keyed cache of compilation results.
#[derive(Debug, Default)]
pub struct Cache {
    store_path: PathBuf,
    entries: FxHashMap<String, CacheEntry>,
}

impl Cache {
    /// Load the cache from its store file.
    ///
    /// A missing store yields an empty cache. A corrupt store is logged
    /// and discarded rather than failing the run: the cost is one full
    /// recompilation, never stale output.
    pub fn load(store_path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&store_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    log!("cache"; "discarding corrupt store {}: {err}", store_path.display());
                    FxHashMap::default()
                }
            },
            Err(_) => FxHashMap::default(),
        };

        Self {
            store_path,
            entries,
        }
    }

    /// Look up the entry for an absolute path.
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(&key_of(path))
    }

    /// Insert or replace the entry for an absolute path.
    pub fn set(&mut self, path: &Path, entry: CacheEntry) {
        self.entries.insert(key_of(path), entry);
    }

    /// Drop the entry for an absolute path. Lookup is by the path key
    /// directly, so exactly one entry can be affected.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(&key_of(path)).is_some()
    }

    /// Persist the cache to its store file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create cache directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string(&self.entries)?;
        fs::write(&self.store_path, json).with_context(|| {
            format!("failed to write cache store {}", self.store_path.display())
        })
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Change-detection fingerprint of a file: its mtime as `secs.nanos`
/// since the epoch.
pub fn fingerprint(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .context("file mtime predates the epoch")?;
    Ok(format!(
        "{}.{:09}",
        since_epoch.as_secs(),
        since_epoch.subsec_nanos()
    ))
}
