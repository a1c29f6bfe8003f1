//! Sage storage crate - SQLite-backed knowledge base.
//!
//! Persists documents and FAQs in a WAL-mode SQLite database with versioned
//! migrations, and exposes them to the retrieval pipeline through the
//! [`KnowledgeStore`] trait.

pub mod db;
pub mod knowledge;
pub mod migrations;
pub mod repository;
pub mod seed;

pub use db::Database;
pub use knowledge::{KnowledgeStore, SqliteKnowledgeStore};
pub use repository::{Document, DocumentRepository, Faq, FaqRepository};
pub use seed::{seed_knowledge_base, SeedReport};
