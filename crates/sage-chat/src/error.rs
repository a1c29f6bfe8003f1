//! Error types for the answering pipeline.

use sage_core::error::SageError;

/// Errors surfaced by the chat orchestrator.
///
/// Answering never produces one of these: retrieval and generation failures
/// degrade to an empty context or the fallback answer. They come from the
/// knowledge store and from explicit corpus maintenance.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("index error: {0}")]
    IndexError(String),
    #[error("embedding error: {0}")]
    EmbeddingError(String),
    #[error("generation error: {0}")]
    GenerationError(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SageError> for ChatError {
    fn from(err: SageError) -> Self {
        let message = err.to_string();
        match err {
            SageError::Storage(_) | SageError::Io(_) => ChatError::StorageError(message),
            SageError::Index(_) | SageError::DimensionMismatch { .. } => {
                ChatError::IndexError(message)
            }
            SageError::Embedding(_) => ChatError::EmbeddingError(message),
            SageError::Generation(_) => ChatError::GenerationError(message),
            SageError::Unavailable(_) => ChatError::Unavailable(message),
            SageError::Config(_) => ChatError::ConfigError(message),
            _ => ChatError::Internal(message),
        }
    }
}
