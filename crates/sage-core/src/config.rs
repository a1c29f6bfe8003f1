use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SageError};

/// Environment variable consulted when `generation.api_key` is empty.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration for Sage.
///
/// Loaded from `~/.sage/config.toml` by default. Every section falls back to
/// its defaults when absent, so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SageConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl SageConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SageConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Check value ranges and backend names.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimensions == 0 {
            return Err(SageError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        if !matches!(self.embedding.backend.as_str(), "onnx" | "hashing" | "none") {
            return Err(SageError::Config(format!(
                "unknown embedding backend '{}' (expected onnx, hashing or none)",
                self.embedding.backend
            )));
        }
        if !matches!(self.generation.backend.as_str(), "gemini" | "none") {
            return Err(SageError::Config(format!(
                "unknown generation backend '{}' (expected gemini or none)",
                self.generation.backend
            )));
        }
        if self.generation.timeout_secs == 0 {
            return Err(SageError::Config(
                "generation.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(SageError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the knowledge-base SQLite file.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.sage/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend: "onnx", "hashing" or "none".
    pub backend: String,
    /// Embedding model name (informational; the ONNX files decide).
    pub model: String,
    /// Directory containing `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Vector dimension. Must match the model output.
    pub dimensions: usize,
    /// Input longer than this many characters is cut before embedding.
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "onnx".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            model_dir: "~/.sage/models/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            max_input_chars: 2000,
        }
    }
}

/// LLM generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend: "gemini" or "none".
    pub backend: String,
    /// Model identifier passed to the provider.
    pub model: String,
    /// API key. Empty means "read from GEMINI_API_KEY".
    pub api_key: String,
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Upper bound on a single generation call; exceeding it triggers the fallback.
    pub timeout_secs: u64,
}

impl GenerationConfig {
    /// The configured API key, or the `GEMINI_API_KEY` environment variable.
    ///
    /// Returns `None` when neither is set.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            model: "gemini-pro".to_string(),
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of knowledge entries retrieved per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Prompt truncation limits, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Maximum characters of each context entry's content.
    pub context_chars: usize,
    /// Maximum characters of each history turn.
    pub history_chars: usize,
    /// Number of most recent history turns included.
    pub history_turns: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            context_chars: 500,
            history_chars: 200,
            history_turns: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SageConfig::default();
        assert_eq!(config.general.data_dir, "~/.sage/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.embedding.backend, "onnx");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.generation.model, "gemini-pro");
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.prompt.context_chars, 500);
        assert_eq!(config.prompt.history_chars, 200);
        assert_eq!(config.prompt.history_turns, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"

[embedding]
backend = "hashing"
dimensions = 128

[generation]
backend = "none"
timeout_secs = 5

[retrieval]
top_k = 5
"#;
        let file = create_temp_config(content);
        let config = SageConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.embedding.backend, "hashing");
        assert_eq!(config.embedding.dimensions, 128);
        assert_eq!(config.generation.backend, "none");
        assert_eq!(config.generation.timeout_secs, 5);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "warn"
"#;
        let file = create_temp_config(content);
        let config = SageConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.prompt.history_turns, 6);
    }

    #[test]
    fn test_load_rejects_unknown_backend() {
        let content = r#"
[embedding]
backend = "faiss"
"#;
        let file = create_temp_config(content);
        let err = SageConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, SageError::Config(_)));
        assert!(err.to_string().contains("faiss"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = SageConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = SageConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = SageConfig::default();
        config.generation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = SageConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, SageError::Io(_)));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let config = GenerationConfig {
            api_key: "  from-config  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-config"));
    }
}
