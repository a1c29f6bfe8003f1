//! Response generation with a deterministic fallback.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sage_core::types::RetrievalResult;

use crate::generation::GenerationBackend;

/// Answer given when generation fails and nothing relevant was retrieved.
pub const FALLBACK_APOLOGY: &str = "I apologize, but I couldn't find relevant information for your query. Please try rephrasing your question or contact our support team for assistance.";

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Model,
    Fallback,
}

/// Answer text together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub text: String,
    pub source: ResponseSource,
}

/// Calls the generation backend under a timeout and falls back on failure.
pub struct ResponseGenerator {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Generate an answer for `prompt`.
    ///
    /// An unavailable backend, a backend error or a timeout all produce the
    /// fallback answer for `context`. This never fails.
    pub async fn generate(&self, prompt: &str, context: &[RetrievalResult]) -> GeneratedResponse {
        match tokio::time::timeout(self.timeout, self.backend.generate(prompt)).await {
            Ok(Ok(text)) => {
                return GeneratedResponse {
                    text,
                    source: ResponseSource::Model,
                }
            }
            Ok(Err(e)) if e.is_unavailable() => {
                debug!(backend = self.backend.name(), "Generation unavailable; using fallback");
            }
            Ok(Err(e)) => {
                warn!(backend = self.backend.name(), error = %e, "Generation failed; using fallback");
            }
            Err(_) => {
                warn!(
                    backend = self.backend.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Generation timed out; using fallback"
                );
            }
        }

        GeneratedResponse {
            text: Self::fallback(context),
            source: ResponseSource::Fallback,
        }
    }

    /// The best context entry's content verbatim, or the apology when the
    /// context is empty.
    pub fn fallback(context: &[RetrievalResult]) -> String {
        match context.first() {
            Some(best) => best.entry.content.clone(),
            None => FALLBACK_APOLOGY.to_string(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
