use thiserror::Error;

/// Top-level error type for the Sage system.
///
/// Each dependency boundary (embedding, index, storage, generation) reports
/// failures through its own variant. Callers that must degrade gracefully
/// (retrieval, response generation) match on the result instead of
/// propagating it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("{0} is unavailable")]
    Unavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SageError {
    /// True for failures caused by a dependency that was never available,
    /// as opposed to one that failed on this particular call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SageError::Unavailable(_))
    }
}

impl From<toml::de::Error> for SageError {
    fn from(err: toml::de::Error) -> Self {
        SageError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SageError {
    fn from(err: serde_json::Error) -> Self {
        SageError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sage operations.
pub type Result<T> = std::result::Result<T, SageError>;
