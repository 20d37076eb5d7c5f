//! Run-scoped de-duplication bookkeeping for declared filenames.
//!
//! For every sanitised filename the registry remembers how many distinct
//! contents have been stored under it and which content hashes those were.
//! The occurrence count drives the `name(n).ext` suffix, the hash set
//! recognises repeats. Nothing here outlives the run.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a payload.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Result of offering a `(filename, hash)` pair to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The same content was already recorded under this filename.
    Duplicate,
    /// First time this content is seen under the filename; `occurrence` is 1-based.
    New { occurrence: usize },
}

#[derive(Debug, Default)]
struct Entry {
    occurrences: usize,
    hashes: HashSet<String>,
}

/// Filename → (occurrence count, content hashes) map.
#[derive(Debug, Default)]
pub struct FilenameRegistry {
    entries: HashMap<String, Entry>,
}

impl FilenameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` under `filename` unless it is already there.
    ///
    /// A duplicate leaves the registry untouched; otherwise the occurrence
    /// count for the filename grows by one and the hash is remembered.
    pub fn register(&mut self, filename: &str, hash: &str) -> Registration {
        if self.contains(filename, hash) {
            return Registration::Duplicate;
        }
        let entry = self.entries.entry(filename.to_string()).or_default();
        entry.occurrences += 1;
        entry.hashes.insert(hash.to_string());
        Registration::New {
            occurrence: entry.occurrences,
        }
    }

    /// Whether `hash` is recorded under `filename`.
    pub fn contains(&self, filename: &str, hash: &str) -> bool {
        self.entries
            .get(filename)
            .is_some_and(|e| e.hashes.contains(hash))
    }

    /// Distinct contents recorded under `filename` so far.
    pub fn occurrences(&self, filename: &str) -> usize {
        self.entries.get(filename).map_or(0, |e| e.occurrences)
    }

    /// Number of distinct filenames seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
