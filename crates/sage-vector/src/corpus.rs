//! The in-memory knowledge corpus: cached entries plus their vectors.
//!
//! Entry `i` always describes vector `i`. Both live in one struct behind one
//! `RwLock`, and every mutation touches both under the same write guard, so
//! the two sequences cannot drift apart. Searches take the read guard and
//! may run concurrently.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sage_core::error::SageError;
use sage_core::types::{KnowledgeEntry, RetrievalResult};

use crate::index::FlatIndex;

#[derive(Debug)]
struct CorpusInner {
    entries: Vec<KnowledgeEntry>,
    index: FlatIndex,
}

/// Thread-safe, append-only store of knowledge entries and their embeddings.
#[derive(Debug)]
pub struct KnowledgeCorpus {
    inner: RwLock<CorpusInner>,
    dimensions: usize,
}

impl KnowledgeCorpus {
    /// Create an empty corpus for embeddings of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: RwLock::new(CorpusInner {
                entries: Vec::new(),
                index: FlatIndex::new(dimensions),
            }),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append one entry with its vector. Returns the entry's position.
    ///
    /// The vector is validated before anything is written, so a rejected
    /// call leaves the corpus unchanged.
    pub fn push(&self, entry: KnowledgeEntry, vector: &[f32]) -> Result<usize, SageError> {
        let mut inner = self.write()?;
        let position = inner.index.insert(vector)?;
        inner.entries.push(entry);
        Ok(position)
    }

    /// Replace the whole corpus with the given entry/vector pairs.
    ///
    /// Vectors are validated first; if any has the wrong dimension nothing is
    /// replaced. The reset and the re-adds happen under one write guard, so
    /// readers see either the old corpus or the complete new one.
    pub fn replace_all(&self, pairs: Vec<(KnowledgeEntry, Vec<f32>)>) -> Result<usize, SageError> {
        if let Some((_, vector)) = pairs
            .iter()
            .find(|(_, vector)| vector.len() != self.dimensions || self.dimensions == 0)
        {
            return Err(SageError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let mut inner = self.write()?;
        inner.entries.clear();
        inner.index.reset();
        for (entry, vector) in pairs {
            inner.index.insert(&vector)?;
            inner.entries.push(entry);
        }
        Ok(inner.entries.len())
    }

    /// Find the `k` entries nearest to `query`, best match first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>, SageError> {
        let inner = self.read()?;
        let k = k.min(inner.entries.len());
        let neighbors = inner.index.search(query, k)?;

        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                inner
                    .entries
                    .get(n.position)
                    .map(|entry| RetrievalResult::from_distance(entry.clone(), n.distance))
            })
            .collect())
    }

    /// Number of cached entries (always equal to the number of vectors).
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of vectors in the index.
    pub fn vector_count(&self) -> usize {
        self.read().map(|inner| inner.index.len()).unwrap_or(0)
    }

    /// Snapshot of the cached entries in insertion order.
    pub fn entries(&self) -> Vec<KnowledgeEntry> {
        self.read()
            .map(|inner| inner.entries.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CorpusInner>, SageError> {
        self.inner
            .read()
            .map_err(|e| SageError::Index(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CorpusInner>, SageError> {
        self.inner
            .write()
            .map_err(|e| SageError::Index(format!("Lock poisoned: {}", e)))
    }
}
