//! Chat orchestrator: retrieval, prompt composition and generation wired
//! into one service object.
//!
//! The orchestrator is built once by the composition root and shared behind
//! an `Arc`. Answering never fails: retrieval problems yield an empty
//! context and generation problems yield the fallback answer. Only corpus
//! maintenance against the knowledge store returns errors.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use sage_core::types::{ChatTurn, EntryKind, KnowledgeEntry, RetrievalResult};
use sage_storage::KnowledgeStore;
use sage_vector::{IngestResult, KnowledgeCorpus, Retriever};

use crate::error::ChatError;
use crate::prompt::PromptComposer;
use crate::response::{ResponseGenerator, ResponseSource};

/// Default number of entries retrieved per question.
const DEFAULT_TOP_K: usize = 3;

/// The answer to one question and the context it was based on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub response_text: String,
    /// Retrieved entries, best match first.
    pub context: Vec<RetrievalResult>,
    pub source: ResponseSource,
}

impl RagResponse {
    /// Compact summary of the retrieved entries for storing alongside the
    /// assistant message.
    pub fn sources(&self) -> Vec<SourceRef> {
        self.context
            .iter()
            .map(|r| SourceRef {
                title: r.entry.title.clone(),
                kind: r.entry.kind,
                score: r.score,
            })
            .collect()
    }
}

/// Reference to a retrieved entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub score: f64,
}

/// Outcome of rebuilding the corpus from the knowledge store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub documents: usize,
    pub faqs: usize,
    pub indexed: usize,
    pub skipped: usize,
}

/// Central coordinator for answering questions from the knowledge base.
///
/// `sync_lock` spans both the store and the corpus: a reload lists and
/// re-indexes under it, and a create writes and indexes under it. A new
/// entry is therefore either in the reload's listing or appended after the
/// swap, never both and never neither.
pub struct ChatOrchestrator {
    retriever: Retriever,
    composer: PromptComposer,
    generator: ResponseGenerator,
    store: Arc<dyn KnowledgeStore>,
    default_top_k: usize,
    sync_lock: Mutex<()>,
}

impl ChatOrchestrator {
    pub fn new(
        retriever: Retriever,
        composer: PromptComposer,
        generator: ResponseGenerator,
        store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            retriever,
            composer,
            generator,
            store,
            default_top_k: DEFAULT_TOP_K,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Number of entries retrieved when the caller has no preference.
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Up to `top_k` knowledge entries for `query`, best match first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        self.retriever.retrieve(query, top_k).await
    }

    /// Answer `query`, retrieving up to `top_k` entries as context.
    pub async fn generate_response(
        &self,
        query: &str,
        history: &[ChatTurn],
        top_k: usize,
    ) -> RagResponse {
        let context = self.retrieve(query, top_k).await;
        self.generate_with_context(query, context, history).await
    }

    /// Answer `query` using a context the caller already retrieved.
    pub async fn generate_with_context(
        &self,
        query: &str,
        context: Vec<RetrievalResult>,
        history: &[ChatTurn],
    ) -> RagResponse {
        let prompt = self.composer.build_prompt(query, &context, history);
        debug!(
            context = context.len(),
            history = history.len(),
            prompt_chars = prompt.chars().count(),
            "Prompt composed"
        );

        let generated = self.generator.generate(&prompt, &context).await;
        RagResponse {
            response_text: generated.text,
            context,
            source: generated.source,
        }
    }

    /// Embed and append entries to the corpus.
    ///
    /// No deduplication is done; adding an entry twice makes it retrievable
    /// twice.
    pub async fn add_documents(&self, entries: Vec<KnowledgeEntry>) -> Vec<IngestResult> {
        self.retriever.add_entries(entries).await
    }

    /// Rebuild the corpus from every document, then every FAQ, in the store.
    ///
    /// The new corpus replaces the old one in a single step.
    pub async fn load_documents_from_db(&self) -> Result<LoadReport, ChatError> {
        let _sync = self.sync_lock.lock().await;
        let documents = self.store.list_documents()?;
        let faqs = self.store.list_faqs()?;

        let mut report = LoadReport {
            documents: documents.len(),
            faqs: faqs.len(),
            ..LoadReport::default()
        };

        let entries: Vec<KnowledgeEntry> = documents.into_iter().chain(faqs).collect();
        let outcomes = self.retriever.reload(entries).await?;

        report.indexed = outcomes.iter().filter(|o| o.is_indexed()).count();
        report.skipped = outcomes.len() - report.indexed;

        info!(
            documents = report.documents,
            faqs = report.faqs,
            indexed = report.indexed,
            skipped = report.skipped,
            "Knowledge base loaded"
        );
        Ok(report)
    }

    /// Persist a new document and add it to the corpus.
    pub async fn create_document(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<(KnowledgeEntry, IngestResult), ChatError> {
        require_non_empty("title", title)?;
        require_non_empty("content", content)?;

        let _sync = self.sync_lock.lock().await;
        let entry = self.store.create_document(title, content, category)?;
        let outcome = self.index_one(entry.clone()).await;
        Ok((entry, outcome))
    }

    /// Persist a new FAQ and add it to the corpus.
    pub async fn create_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<(KnowledgeEntry, IngestResult), ChatError> {
        require_non_empty("question", question)?;
        require_non_empty("answer", answer)?;

        let _sync = self.sync_lock.lock().await;
        let entry = self.store.create_faq(question, answer, category)?;
        let outcome = self.index_one(entry.clone()).await;
        Ok((entry, outcome))
    }

    /// The searchable corpus.
    pub fn corpus(&self) -> &Arc<KnowledgeCorpus> {
        self.retriever.corpus()
    }

    pub fn embedder_name(&self) -> &'static str {
        self.retriever.embedder_name()
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.backend_name()
    }

    async fn index_one(&self, entry: KnowledgeEntry) -> IngestResult {
        self.add_documents(vec![entry])
            .await
            .pop()
            .unwrap_or(IngestResult::Skipped {
                reason: "no outcome reported".to_string(),
            })
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sage_storage::{Database, SqliteKnowledgeStore};
    use sage_vector::MockEmbedding;

    use crate::generation::NullGeneration;
    use crate::response::FALLBACK_APOLOGY;

    fn make_orchestrator() -> ChatOrchestrator {
        let db = Arc::new(Database::in_memory().unwrap());
        ChatOrchestrator::new(
            Retriever::new(MockEmbedding::new()),
            PromptComposer::default(),
            ResponseGenerator::new(Arc::new(NullGeneration), Duration::from_secs(1)),
            Arc::new(SqliteKnowledgeStore::new(db)),
        )
    }

    #[tokio::test]
    async fn test_empty_corpus_apologizes() {
        let orchestrator = make_orchestrator();
        let response = orchestrator.generate_response("What is LMS?", &[], 3).await;
        assert!(response.context.is_empty());
        assert_eq!(response.response_text, FALLBACK_APOLOGY);
        assert_eq!(response.source, ResponseSource::Fallback);
    }

    #[tokio::test]
    async fn test_create_document_is_searchable() {
        let orchestrator = make_orchestrator();
        let (entry, outcome) = orchestrator
            .create_document("Certificate Information", "Certificates after completion", "")
            .await
            .unwrap();
        assert_eq!(outcome, IngestResult::Indexed { position: 0 });

        let results = orchestrator.retrieve("certificate information", 3).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry, entry);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let orchestrator = make_orchestrator();
        let err = orchestrator.create_faq("  ", "answer", "").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
        assert!(orchestrator.corpus().is_empty());
    }

    #[tokio::test]
    async fn test_load_orders_documents_before_faqs() {
        let orchestrator = make_orchestrator();
        orchestrator.create_faq("FAQ first?", "Yes", "").await.unwrap();
        orchestrator
            .create_document("Doc second", "Still listed first", "")
            .await
            .unwrap();

        let report = orchestrator.load_documents_from_db().await.unwrap();
        assert_eq!(
            report,
            LoadReport {
                documents: 1,
                faqs: 1,
                indexed: 2,
                skipped: 0
            }
        );
        let kinds: Vec<EntryKind> = orchestrator
            .corpus()
            .entries()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EntryKind::Document, EntryKind::Faq]);
    }

    #[tokio::test]
    async fn test_sources_summary() {
        let orchestrator = make_orchestrator();
        orchestrator
            .create_faq("Can I get a refund for a course?", "Yes, within 7 days.", "Payments")
            .await
            .unwrap();

        let response = orchestrator.generate_response("refund course", &[], 3).await;
        let sources = response.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "Can I get a refund for a course?");
        assert_eq!(sources[0].kind, EntryKind::Faq);

        let json = serde_json::to_value(&sources[0]).unwrap();
        assert_eq!(json["type"], "faq");
    }
}
