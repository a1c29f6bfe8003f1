//! Retrieval-augmented answering for Sage.
//!
//! Composes retrieved knowledge and recent chat history into a prompt,
//! calls the configured generation backend, and falls back to a
//! deterministic answer when generation is unavailable.

pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod prompt;
pub mod response;

pub use error::ChatError;
pub use generation::{GeminiBackend, GenerationBackend, NullGeneration};
pub use orchestrator::{ChatOrchestrator, LoadReport, RagResponse, SourceRef};
pub use prompt::PromptComposer;
pub use response::{GeneratedResponse, ResponseGenerator, ResponseSource, FALLBACK_APOLOGY};
