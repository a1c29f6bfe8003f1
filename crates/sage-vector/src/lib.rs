//! Sage vector crate - embedding services, exact vector index, and retrieval.
//!
//! Provides an append-only flat index searched by squared Euclidean distance,
//! a knowledge corpus that keeps entries and vectors in lock-step, an
//! embedding service trait with ONNX, hashing, and null implementations, and
//! the retriever that maps a query string to scored knowledge entries.

pub mod corpus;
pub mod embedding;
pub mod index;
pub mod retriever;

pub use corpus::KnowledgeCorpus;
pub use embedding::{
    DynEmbeddingService, EmbeddingService, MockEmbedding, NullEmbedding, OnnxEmbeddingService,
};
pub use index::{FlatIndex, Neighbor};
pub use retriever::{IngestResult, Retriever};
