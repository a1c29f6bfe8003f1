//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` runs a sentence-transformer ONNX export (the
//!   reference model is all-MiniLM-L6-v2, 384 dimensions) through ort and
//!   tokenizes with the HuggingFace tokenizers crate.
//! - `MockEmbedding` hashes words into a fixed number of buckets. It is
//!   deterministic and needs no model files, so texts that share words land
//!   near each other. Used in tests and for local development.
//! - `NullEmbedding` stands in when no model could be loaded. Every call
//!   fails with `SageError::Unavailable`, which the retriever turns into an
//!   empty result.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use ort::session::Session;
use ort::value::TensorRef;
use sage_core::error::SageError;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

/// Dimension of the reference sentence-transformer model.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Longest token sequence fed to the ONNX model.
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Service for turning text into fixed-dimension vectors.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, SageError>> + Send;

    /// Dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not
/// object-safe. This trait boxes the future so the backend can be chosen at
/// startup and stored as `Box<dyn DynEmbeddingService>`.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, SageError>> + Send + 'a>>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &'static str;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, SageError>> + Send + 'a>>
    {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }

    fn name(&self) -> &'static str {
        EmbeddingService::name(self)
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed sentence-transformer embeddings.
///
/// Expects a model directory containing `model.onnx` and `tokenizer.json`.
/// The model takes `input_ids`, `attention_mask` and `token_type_ids` and
/// returns token embeddings of shape `[1, seq_len, hidden]`, which are
/// mean-pooled over the attention mask and L2-normalized.
pub struct OnnxEmbeddingService {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimensions: usize,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    ///
    /// `dimensions` is the expected hidden size; inference fails with
    /// `DimensionMismatch` if the model produces something else.
    pub fn from_directory(model_dir: &Path, dimensions: usize) -> Result<Self, SageError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(SageError::Unavailable(format!(
                "ONNX model at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(SageError::Unavailable(format!(
                "tokenizer at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| SageError::Embedding(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| SageError::Embedding(format!("ONNX set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| SageError::Embedding(format!("ONNX load model: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| SageError::Embedding(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..TruncationParams::default()
            }))
            .map_err(|e| SageError::Embedding(format!("Failed to set truncation: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimensions,
        })
    }

    fn embed_sync(
        session: &Mutex<Session>,
        tokenizer: &Tokenizer,
        dimensions: usize,
        text: &str,
    ) -> Result<Vec<f32>, SageError> {
        if text.trim().is_empty() {
            return Err(SageError::Embedding("Cannot embed empty text".to_string()));
        }

        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| SageError::Embedding(format!("Tokenization failed: {}", e)))?;

        let to_i64 = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
        let input_ids = to_i64(encoding.get_ids());
        let attention_mask = to_i64(encoding.get_attention_mask());
        let token_type_ids = to_i64(encoding.get_type_ids());
        let seq_len = input_ids.len();

        let as_batch = |values: Vec<i64>, name: &str| {
            ndarray::Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| SageError::Embedding(format!("{} array: {}", name, e)))
        };
        let ids_array = as_batch(input_ids, "input_ids")?;
        let mask_array = as_batch(attention_mask.clone(), "attention_mask")?;
        let type_array = as_batch(token_type_ids, "token_type_ids")?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| SageError::Embedding(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| SageError::Embedding(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| SageError::Embedding(format!("TensorRef token_type_ids: {}", e)))?;

        let mut session = session
            .lock()
            .map_err(|e| SageError::Embedding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| SageError::Embedding(format!("ONNX inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SageError::Embedding(format!("Extract embeddings: {}", e)))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        let hidden = match shape_dims.last() {
            Some(&d) if shape_dims.len() >= 2 && d > 0 => d as usize,
            _ => {
                return Err(SageError::Embedding(format!(
                    "Unexpected output shape: {:?}",
                    shape_dims
                )))
            }
        };
        if hidden != dimensions {
            return Err(SageError::DimensionMismatch {
                expected: dimensions,
                actual: hidden,
            });
        }

        let mut pooled = mean_pool(data, &attention_mask, hidden);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SageError> {
        // Inference is CPU-bound; keep it off the async workers.
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let dimensions = self.dimensions;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            Self::embed_sync(&session, &tokenizer, dimensions, &text)
        })
        .await
        .map_err(|e| SageError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Average token embeddings over positions where the attention mask is set.
///
/// `data` is the flattened `[seq_len, hidden]` output for one sequence.
fn mean_pool(data: &[f32], attention_mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token, &mask) in attention_mask.iter().enumerate() {
        if mask <= 0 {
            continue;
        }
        let offset = token * hidden;
        if let Some(row) = data.get(offset..offset + hidden) {
            for (acc, value) in pooled.iter_mut().zip(row) {
                *acc += value;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for value in &mut pooled {
            *value /= count;
        }
    }
    pooled
}

/// Scale a vector to unit length in place. Zero vectors are left as-is.
fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding
// ---------------------------------------------------------------------------

/// Deterministic feature-hashing embedding.
///
/// Each lowercase alphanumeric word is hashed to a bucket and a sign; the
/// bucket counts are L2-normalized. Identical texts produce identical
/// vectors and texts sharing words are closer than unrelated ones.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    /// A 384-dimensional mock, matching the reference model.
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_words(&self, text: &str) -> Option<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut words = 0usize;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            words += 1;
        }

        if words == 0 {
            return None;
        }
        l2_normalize(&mut vector);
        Some(vector)
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SageError> {
        if self.dimensions == 0 {
            return Err(SageError::Embedding("Zero embedding dimension".to_string()));
        }
        self.hash_words(text)
            .ok_or_else(|| SageError::Embedding("Cannot embed empty text".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

// ---------------------------------------------------------------------------
// NullEmbedding
// ---------------------------------------------------------------------------

/// Embedding backend used when no model is available.
#[derive(Debug, Clone)]
pub struct NullEmbedding {
    dimensions: usize,
}

impl NullEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingService for NullEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, SageError> {
        Err(SageError::Unavailable("embedding model".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
