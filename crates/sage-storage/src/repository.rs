//! Repositories for knowledge-base records.
//!
//! `DocumentRepository` and `FaqRepository` operate on the shared
//! [`Database`] using raw SQL. Listing is ordered by id, which is the
//! insertion order and therefore stable across runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use sage_core::error::SageError;
use sage_core::types::KnowledgeEntry;

use crate::db::Database;

/// A knowledge-base article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for KnowledgeEntry {
    fn from(doc: Document) -> Self {
        KnowledgeEntry::document(doc.id, doc.title, doc.content).with_category(doc.category)
    }
}

/// A frequently asked question with its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<Faq> for KnowledgeEntry {
    fn from(faq: Faq) -> Self {
        KnowledgeEntry::faq(faq.id, faq.question, faq.answer).with_category(faq.category)
    }
}

fn storage_err(context: &str) -> impl Fn(rusqlite::Error) -> SageError + '_ {
    move |e| SageError::Storage(format!("{}: {}", context, e))
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Repository for documents.
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new document and return the stored row.
    pub fn create(&self, title: &str, content: &str, category: &str) -> Result<Document, SageError> {
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (title, content, category, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![title, content, category, Utc::now().timestamp()],
            )
            .map_err(storage_err("Failed to save document"))?;
            Ok(conn.last_insert_rowid())
        })?;

        self.find_by_id(id)?
            .ok_or_else(|| SageError::Storage(format!("Document {} missing after insert", id)))
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Document>, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, category, created_at FROM documents WHERE id = ?1",
                [id],
                row_to_document,
            )
            .optional()
            .map_err(storage_err("Failed to load document"))
        })
    }

    /// First document with exactly this title, if any.
    pub fn find_by_title(&self, title: &str) -> Result<Option<Document>, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, category, created_at FROM documents
                 WHERE title = ?1 ORDER BY id LIMIT 1",
                [title],
                row_to_document,
            )
            .optional()
            .map_err(storage_err("Failed to load document"))
        })
    }

    /// All documents in id order.
    pub fn list_all(&self) -> Result<Vec<Document>, SageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, content, category, created_at FROM documents ORDER BY id")
                .map_err(storage_err("Failed to prepare document query"))?;
            let rows = stmt
                .query_map([], row_to_document)
                .map_err(storage_err("Failed to list documents"))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Failed to read document row"))
        })
    }

    pub fn count(&self) -> Result<u64, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(storage_err("Failed to count documents"))
        })
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        created_at: timestamp_to_datetime(row.get(4)?),
    })
}

/// Repository for FAQs.
pub struct FaqRepository {
    db: Arc<Database>,
}

impl FaqRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new FAQ and return the stored row.
    pub fn create(&self, question: &str, answer: &str, category: &str) -> Result<Faq, SageError> {
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO faqs (question, answer, category, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![question, answer, category, Utc::now().timestamp()],
            )
            .map_err(storage_err("Failed to save FAQ"))?;
            Ok(conn.last_insert_rowid())
        })?;

        self.find_by_id(id)?
            .ok_or_else(|| SageError::Storage(format!("FAQ {} missing after insert", id)))
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Faq>, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, question, answer, category, created_at FROM faqs WHERE id = ?1",
                [id],
                row_to_faq,
            )
            .optional()
            .map_err(storage_err("Failed to load FAQ"))
        })
    }

    /// First FAQ with exactly this question, if any.
    pub fn find_by_question(&self, question: &str) -> Result<Option<Faq>, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, question, answer, category, created_at FROM faqs
                 WHERE question = ?1 ORDER BY id LIMIT 1",
                [question],
                row_to_faq,
            )
            .optional()
            .map_err(storage_err("Failed to load FAQ"))
        })
    }

    /// All FAQs in id order.
    pub fn list_all(&self) -> Result<Vec<Faq>, SageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, question, answer, category, created_at FROM faqs ORDER BY id")
                .map_err(storage_err("Failed to prepare FAQ query"))?;
            let rows = stmt
                .query_map([], row_to_faq)
                .map_err(storage_err("Failed to list FAQs"))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Failed to read FAQ row"))
        })
    }

    pub fn count(&self) -> Result<u64, SageError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM faqs", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(storage_err("Failed to count FAQs"))
        })
    }
}

fn row_to_faq(row: &Row<'_>) -> rusqlite::Result<Faq> {
    Ok(Faq {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        category: row.get(3)?,
        created_at: timestamp_to_datetime(row.get(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_core::types::EntryKind;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    #[test]
    fn test_create_and_find_document() {
        let repo = DocumentRepository::new(make_db());
        let doc = repo
            .create("Course Enrollment Process", "Browse the catalog", "Courses")
            .unwrap();
        assert!(doc.id > 0);

        let found = repo.find_by_id(doc.id).unwrap().unwrap();
        assert_eq!(found, doc);
        assert_eq!(repo.find_by_id(doc.id + 100).unwrap(), None);
    }

    #[test]
    fn test_list_documents_in_id_order() {
        let repo = DocumentRepository::new(make_db());
        let a = repo.create("A", "first", "").unwrap();
        let b = repo.create("B", "second", "").unwrap();
        let c = repo.create("C", "third", "").unwrap();

        let ids: Vec<i64> = repo.list_all().unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_find_document_by_title() {
        let repo = DocumentRepository::new(make_db());
        repo.create("Certificate Information", "Earn certificates", "Certificates")
            .unwrap();
        assert!(repo.find_by_title("Certificate Information").unwrap().is_some());
        assert!(repo.find_by_title("Missing").unwrap().is_none());
    }

    #[test]
    fn test_create_and_list_faqs() {
        let repo = FaqRepository::new(make_db());
        let faq = repo
            .create("How do I reset my password?", "Use Forgot Password", "Account")
            .unwrap();

        let all = repo.list_all().unwrap();
        assert_eq!(all, vec![faq.clone()]);
        assert_eq!(
            repo.find_by_question("How do I reset my password?").unwrap(),
            Some(faq)
        );
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_document_into_entry() {
        let repo = DocumentRepository::new(make_db());
        let doc = repo.create("Title", "Body", "").unwrap();
        let entry: KnowledgeEntry = doc.clone().into();
        assert_eq!(entry.id, doc.id);
        assert_eq!(entry.kind, EntryKind::Document);
        assert_eq!(entry.category, None);
    }

    #[test]
    fn test_faq_into_entry() {
        let repo = FaqRepository::new(make_db());
        let faq = repo.create("Question?", "Answer.", "General").unwrap();
        let entry: KnowledgeEntry = faq.into();
        assert_eq!(entry.title, "Question?");
        assert_eq!(entry.content, "Answer.");
        assert_eq!(entry.kind, EntryKind::Faq);
        assert_eq!(entry.category.as_deref(), Some("General"));
    }
}
