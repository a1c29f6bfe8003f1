//! Knowledge store seam used by the retrieval pipeline.

use std::sync::Arc;

use sage_core::error::SageError;
use sage_core::types::KnowledgeEntry;

use crate::db::Database;
use crate::repository::{DocumentRepository, FaqRepository};

/// Source of documents and FAQs for the retrieval corpus.
///
/// Listing order must be stable between calls so that a reload produces
/// the same corpus positions for unchanged data.
pub trait KnowledgeStore: Send + Sync {
    fn list_documents(&self) -> Result<Vec<KnowledgeEntry>, SageError>;

    fn list_faqs(&self) -> Result<Vec<KnowledgeEntry>, SageError>;

    fn count_documents(&self) -> Result<u64, SageError>;

    fn count_faqs(&self) -> Result<u64, SageError>;

    fn create_document(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<KnowledgeEntry, SageError>;

    fn create_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<KnowledgeEntry, SageError>;
}

/// [`KnowledgeStore`] backed by the SQLite repositories.
pub struct SqliteKnowledgeStore {
    documents: DocumentRepository,
    faqs: FaqRepository,
}

impl SqliteKnowledgeStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            documents: DocumentRepository::new(db.clone()),
            faqs: FaqRepository::new(db),
        }
    }
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn list_documents(&self) -> Result<Vec<KnowledgeEntry>, SageError> {
        Ok(self
            .documents
            .list_all()?
            .into_iter()
            .map(KnowledgeEntry::from)
            .collect())
    }

    fn list_faqs(&self) -> Result<Vec<KnowledgeEntry>, SageError> {
        Ok(self
            .faqs
            .list_all()?
            .into_iter()
            .map(KnowledgeEntry::from)
            .collect())
    }

    fn count_documents(&self) -> Result<u64, SageError> {
        self.documents.count()
    }

    fn count_faqs(&self) -> Result<u64, SageError> {
        self.faqs.count()
    }

    fn create_document(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<KnowledgeEntry, SageError> {
        self.documents
            .create(title, content, category)
            .map(KnowledgeEntry::from)
    }

    fn create_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<KnowledgeEntry, SageError> {
        self.faqs
            .create(question, answer, category)
            .map(KnowledgeEntry::from)
    }
}
