//! Text generation backends.
//!
//! `GeminiBackend` calls the Generative Language REST API. `NullGeneration`
//! is installed when no API key is configured and always reports itself as
//! unavailable, which routes every answer through the fallback.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use sage_core::config::GenerationConfig;
use sage_core::error::SageError;

/// A language model that turns a prompt into answer text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SageError>;

    /// Short backend identifier for logs.
    fn name(&self) -> &'static str;
}

/// Backend that never generates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeneration;

#[async_trait]
impl GenerationBackend for NullGeneration {
    async fn generate(&self, _prompt: &str) -> Result<String, SageError> {
        Err(SageError::Unavailable("generation backend".to_string()))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Google Gemini over `models/{model}:generateContent`.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SageError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SageError::Generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a backend from configuration.
    ///
    /// Returns `Ok(None)` when the backend is disabled or no API key is
    /// available; the caller installs [`NullGeneration`] in that case.
    pub fn from_config(config: &GenerationConfig) -> Result<Option<Self>, SageError> {
        if config.backend != "gemini" {
            return Ok(None);
        }
        match config.resolve_api_key() {
            Some(key) => Self::new(key, &config.model, &config.base_url).map(Some),
            None => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, SageError> {
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(prompt))
            .send()
            .await
            .map_err(|e| SageError::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SageError::Generation(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(SageError::Generation(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let text = parse_response(&body)?;
        debug!(model = %self.model, chars = text.chars().count(), "Gemini response received");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

/// Extract the answer text from a `generateContent` response body.
///
/// Text parts of the first candidate are concatenated. A blocked prompt or a
/// response without any text is an error.
fn parse_response(body: &str) -> Result<String, SageError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| SageError::Generation(format!("Failed to parse response: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(SageError::Generation(format!("Prompt blocked: {}", reason)));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(SageError::Generation("Response contained no text".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_generation_is_unavailable() {
        let err = NullGeneration.generate("hello").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(NullGeneration.name(), "none");
    }

    #[test]
    fn test_generate_url() {
        let backend = GeminiBackend::new(
            "key",
            "gemini-pro",
            "https://generativelanguage.googleapis.com/v1beta/",
        )
        .unwrap();
        assert_eq!(
            backend.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_build_request() {
        let body = GeminiBackend::build_request("What is a certificate?");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "What is a certificate?"
        );
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "learner!"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(parse_response(body).unwrap(), "Hello, learner!");
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_response_without_text() {
        assert!(parse_response(r#"{"candidates": []}"#).is_err());
        assert!(parse_response(r#"{"candidates": [{"finishReason": "STOP"}]}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = GenerationConfig {
            backend: "none".to_string(),
            api_key: "secret".to_string(),
            ..GenerationConfig::default()
        };
        assert!(GeminiBackend::from_config(&config).unwrap().is_none());

        let config = GenerationConfig {
            api_key: "secret".to_string(),
            ..GenerationConfig::default()
        };
        let backend = GeminiBackend::from_config(&config).unwrap().unwrap();
        assert_eq!(backend.model(), "gemini-pro");
        assert_eq!(backend.name(), "gemini");
        assert!(!format!("{:?}", backend).contains("secret"));
    }
}
