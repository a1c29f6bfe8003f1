//! Retriever: embeds queries and entries and searches the knowledge corpus.
//!
//! Retrieval never fails from the caller's point of view. An empty corpus,
//! an unavailable embedder, an empty query or `top_k == 0` all produce an
//! empty result; failures are logged and swallowed here, at the boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sage_core::error::SageError;
use sage_core::text::truncate_chars;
use sage_core::types::{KnowledgeEntry, RetrievalResult};

use crate::corpus::KnowledgeCorpus;
use crate::embedding::{DynEmbeddingService, EmbeddingService};

/// Default cap on characters passed to the embedder.
const DEFAULT_MAX_INPUT_CHARS: usize = 2000;

/// Outcome of adding one knowledge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestResult {
    /// The entry and its vector were appended at `position`.
    Indexed { position: usize },
    /// The entry could not be embedded and was left out of the corpus.
    Skipped { reason: String },
}

impl IngestResult {
    pub fn is_indexed(&self) -> bool {
        matches!(self, IngestResult::Indexed { .. })
    }
}

/// Maps query strings to ranked knowledge entries.
///
/// Uses dynamic dispatch for the embedder so the backend (ONNX, hashing or
/// null) is picked once at startup.
///
/// Writers (`add_entries`, `reload`) hold `write_lock` from their first
/// embedding until their last corpus mutation, so an append can never land
/// between a reload's embedding phase and its swap. Searches only take the
/// corpus read guard.
pub struct Retriever {
    corpus: Arc<KnowledgeCorpus>,
    embedder: Box<dyn DynEmbeddingService>,
    max_input_chars: usize,
    write_lock: Mutex<()>,
}

impl Retriever {
    /// Create a retriever with an empty corpus sized for `embedder`.
    pub fn new(embedder: impl EmbeddingService + 'static) -> Self {
        Self::new_dyn(Box::new(embedder))
    }

    /// Create a retriever from a pre-boxed embedding service.
    pub fn new_dyn(embedder: Box<dyn DynEmbeddingService>) -> Self {
        let corpus = Arc::new(KnowledgeCorpus::new(embedder.dimensions()));
        Self {
            corpus,
            embedder,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            write_lock: Mutex::new(()),
        }
    }

    /// Cap the number of characters of any text handed to the embedder.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Retrieve up to `top_k` entries for `query`, best match first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        match self.try_retrieve(query, top_k).await {
            Ok(results) => results,
            Err(e) if e.is_unavailable() => {
                debug!(error = %e, "Retrieval skipped");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Retrieval failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// Retrieval with the failure reason exposed.
    ///
    /// `Ok(vec![])` covers the policy cases (empty corpus, blank query or
    /// `top_k == 0`);
    /// `Err` is returned when the embedder or the index failed.
    pub async fn try_retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, SageError> {
        if top_k == 0 || query.trim().is_empty() || self.corpus.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embed(query).await?;
        let results = self.corpus.search(&query_vec, top_k)?;

        debug!(
            top_k,
            returned = results.len(),
            best_score = results.first().map(|r| r.score),
            "Retrieved knowledge entries"
        );
        Ok(results)
    }

    /// Embed and append each entry, in order.
    ///
    /// Entries are not deduplicated: adding the same entry twice stores it
    /// twice. An entry whose embedding fails is skipped and reported.
    /// Waits for any reload in progress, then appends to the reloaded corpus.
    pub async fn add_entries(&self, entries: Vec<KnowledgeEntry>) -> Vec<IngestResult> {
        let _writer = self.write_lock.lock().await;
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let outcome = match self.embed(&entry.embedding_text()).await {
                Ok(vector) => {
                    let id = entry.id;
                    let kind = entry.kind;
                    match self.corpus.push(entry, &vector) {
                        Ok(position) => {
                            debug!(id, kind = %kind, position, "Knowledge entry indexed");
                            IngestResult::Indexed { position }
                        }
                        Err(e) => skipped(id, e),
                    }
                }
                Err(e) => skipped(entry.id, e),
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Rebuild the corpus from `entries`, replacing whatever was indexed.
    ///
    /// All entries are embedded first; the swap happens in one step so
    /// concurrent searches never see a half-loaded corpus. Appends issued
    /// while the reload runs are applied after the swap.
    pub async fn reload(
        &self,
        entries: Vec<KnowledgeEntry>,
    ) -> Result<Vec<IngestResult>, SageError> {
        let _writer = self.write_lock.lock().await;
        let mut pairs = Vec::with_capacity(entries.len());
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            match self.embed(&entry.embedding_text()).await {
                Ok(vector) => {
                    outcomes.push(IngestResult::Indexed {
                        position: pairs.len(),
                    });
                    pairs.push((entry, vector));
                }
                Err(e) => outcomes.push(skipped(entry.id, e)),
            }
        }

        let count = self.corpus.replace_all(pairs)?;
        info!(
            indexed = count,
            skipped = outcomes.len() - count,
            embedder = self.embedder.name(),
            "Knowledge corpus reloaded"
        );
        Ok(outcomes)
    }

    /// Shared handle to the underlying corpus.
    pub fn corpus(&self) -> &Arc<KnowledgeCorpus> {
        &self.corpus
    }

    /// Name of the active embedding backend.
    pub fn embedder_name(&self) -> &'static str {
        self.embedder.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SageError> {
        let text = truncate_chars(text, self.max_input_chars);
        let vector = self.embedder.embed_boxed(text).await?;
        if vector.len() != self.corpus.dimensions() {
            return Err(SageError::DimensionMismatch {
                expected: self.corpus.dimensions(),
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

fn skipped(id: i64, err: SageError) -> IngestResult {
    if err.is_unavailable() {
        debug!(id, error = %err, "Knowledge entry not indexed");
    } else {
        warn!(id, error = %err, "Knowledge entry not indexed");
    }
    IngestResult::Skipped {
        reason: err.to_string(),
    }
}
