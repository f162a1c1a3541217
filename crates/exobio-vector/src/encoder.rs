//! Text encoder trait and implementations.
//!
//! - `OnnxTextEncoder` loads a sentence-encoder ONNX export (e.g. a
//!   PubMedBERT abstract model) via ort and tokenizes with the HuggingFace
//!   tokenizers crate. This is the production encoding backend.
//! - `HashEncoder` provides deterministic bag-of-tokens vectors for testing
//!   and for running without a model file.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use exobio_core::error::ExobioError;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

/// Service for converting text into fixed-dimensional embedding vectors.
///
/// Used for both index builds (one call per document) and queries. A given
/// implementation always produces vectors of the same dimensionality.
pub trait TextEncoder: Send + Sync {
    /// Encode the given text into an embedding vector.
    fn encode(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, ExobioError>> + Send;

    /// Return the dimensionality of vectors produced by this encoder.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`TextEncoder`] for dynamic dispatch.
///
/// Because `TextEncoder::encode` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Box<dyn DynTextEncoder>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `TextEncoder`
/// automatically implements `DynTextEncoder`.
pub trait DynTextEncoder: Send + Sync {
    /// Encode the given text into an embedding vector (boxed future).
    fn encode_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, ExobioError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this encoder.
    fn dimensions(&self) -> usize;
}

/// Blanket impl: any `TextEncoder` automatically implements `DynTextEncoder`.
impl<T: TextEncoder> DynTextEncoder for T {
    fn encode_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, ExobioError>> + Send + 'a>,
    > {
        Box::pin(self.encode(text))
    }

    fn dimensions(&self) -> usize {
        TextEncoder::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OnnxTextEncoder - real ONNX Runtime inference
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed encoder using a sentence-encoder model.
///
/// Expects a model directory containing:
/// - `model.onnx`  — the sentence-encoder ONNX export
/// - `tokenizer.json` — the HuggingFace fast-tokenizer file
///
/// The model should accept `input_ids`, `attention_mask`, and
/// `token_type_ids` as i64 inputs and produce token-level embeddings.
/// Input longer than the token budget is truncated by the tokenizer, so
/// arbitrarily long abstracts never error. Mean pooling (masked) is applied
/// to produce a single vector per input, followed by L2 normalization.
pub struct OnnxTextEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimensions: usize,
}

// ort::Session is Send + Sync internally (uses Arc<SharedSessionInner>).
unsafe impl Send for OnnxTextEncoder {}
unsafe impl Sync for OnnxTextEncoder {}

impl std::fmt::Debug for OnnxTextEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxTextEncoder")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxTextEncoder {
    /// Load a sentence-encoder model from the given directory.
    ///
    /// The directory must contain `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path, max_tokens: usize) -> Result<Self, ExobioError> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
            max_tokens,
        )
    }

    /// Load from explicit model and tokenizer file paths.
    pub fn from_files(
        model_path: &Path,
        tokenizer_path: &Path,
        max_tokens: usize,
    ) -> Result<Self, ExobioError> {
        if !model_path.exists() {
            return Err(ExobioError::Encoding(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(ExobioError::Encoding(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| ExobioError::Encoding(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| ExobioError::Encoding(format!("ONNX set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ExobioError::Encoding(format!("ONNX load model: {}", e)))?;

        // Detect output dimensions from the model output type.
        // Sentence-encoder output is typically [batch, seq_len, hidden_dim].
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 768 })
            .unwrap_or(768);

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ExobioError::Encoding(format!("Failed to load tokenizer: {}", e)))?;

        // Truncate at the model token budget instead of erroring on long input.
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| ExobioError::Encoding(format!("Failed to set truncation: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            max_tokens,
            "Loaded ONNX encoder model"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimensions,
        })
    }

    /// Tokenize, run inference, and mean-pool the output.
    fn encode_sync(&self, text: &str) -> Result<Vec<f32>, ExobioError> {
        if text.is_empty() {
            return Err(ExobioError::Encoding("Cannot encode empty text".to_string()));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ExobioError::Encoding(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();

        // Create ndarray views with shape [1, seq_len] for batch size 1.
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| ExobioError::Encoding(format!("input_ids array: {}", e)))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| ExobioError::Encoding(format!("attention_mask array: {}", e)))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| ExobioError::Encoding(format!("token_type_ids array: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| ExobioError::Encoding(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| ExobioError::Encoding(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| ExobioError::Encoding(format!("TensorRef token_type_ids: {}", e)))?;

        // Run inference: input_ids, attention_mask, token_type_ids
        let mut session = self
            .session
            .lock()
            .map_err(|e| ExobioError::Encoding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| ExobioError::Encoding(format!("ONNX inference failed: {}", e)))?;

        // Extract token embeddings as flat slice: [1, seq_len, hidden_dim].
        // ort 2.0 try_extract_tensor returns (&Shape, &[f32]).
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExobioError::Encoding(format!("Extract embeddings: {}", e)))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        if shape_dims.len() < 2 {
            return Err(ExobioError::Encoding(format!(
                "Unexpected output shape: {:?}",
                shape_dims
            )));
        }

        let hidden_dim = *shape_dims.last().unwrap() as usize;

        // Mean pooling over the sequence dimension, masked by attention_mask.
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;

        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for dim in 0..hidden_dim {
                    pooled[dim] += data[offset + dim];
                }
                count += 1.0;
            }
        }

        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        // L2-normalize the embedding.
        let norm: f32 = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut pooled {
                *val /= norm;
            }
        }

        Ok(pooled)
    }
}

impl TextEncoder for OnnxTextEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ExobioError> {
        // ONNX Runtime inference is CPU-bound; run on a blocking thread.
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let dims = self.dimensions;
        let text_owned = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoder = OnnxTextEncoder {
                session,
                tokenizer,
                dimensions: dims,
            };
            encoder.encode_sync(&text_owned)
        })
        .await
        .map_err(|e| ExobioError::Encoding(format!("Encoding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// HashEncoder - deterministic bag-of-tokens vectors for testing
// ---------------------------------------------------------------------------

/// Hash-based encoder that returns deterministic 384-dimensional vectors.
///
/// Each lowercased alphanumeric token is hashed into one dimension with a
/// hash-derived sign, so texts that share tokens produce vectors with
/// proportionally higher cosine similarity. Identical inputs always produce
/// identical outputs, which allows testing ranking and persistence without
/// a real model.
#[derive(Debug, Clone, Default)]
pub struct HashEncoder;

const HASH_DIMENSIONS: usize = 384;

impl HashEncoder {
    pub fn new() -> Self {
        Self
    }

    fn tokens_to_vector(text: &str) -> Vec<f32> {
        let mut result = vec![0.0f32; HASH_DIMENSIONS];
        let mut token_count = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();

            let dim = ((h >> 1) % HASH_DIMENSIONS as u64) as usize;
            let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
            result[dim] += sign;
            token_count += 1;
        }

        if token_count == 0 {
            return result;
        }

        // L2-normalize to produce unit vectors (matching OnnxTextEncoder).
        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl TextEncoder for HashEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ExobioError> {
        if text.trim().is_empty() {
            return Err(ExobioError::Encoding("Cannot encode empty text".to_string()));
        }
        Ok(Self::tokens_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        HASH_DIMENSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hash_encoder_dimension() {
        let encoder = HashEncoder::new();
        let vec = encoder.encode("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);
    }

    #[tokio::test]
    async fn test_hash_encoder_deterministic() {
        let encoder = HashEncoder::new();
        let v1 = encoder.encode("same text").await.unwrap();
        let v2 = encoder.encode("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_hash_encoder_different_inputs() {
        let encoder = HashEncoder::new();
        let v1 = encoder.encode("bone density spaceflight").await.unwrap();
        let v2 = encoder.encode("microbial community dynamics").await.unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_hash_encoder_empty_text() {
        let encoder = HashEncoder::new();
        assert!(encoder.encode("").await.is_err());
        assert!(encoder.encode("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_hash_encoder_unit_norm() {
        let encoder = HashEncoder::new();
        let vec = encoder.encode("plant growth in microgravity").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_encoder_overlap_raises_similarity() {
        let encoder = HashEncoder::new();
        let base = encoder
            .encode("plant cell walls in microgravity")
            .await
            .unwrap();
        let related = encoder
            .encode("cell walls of plants under microgravity stress")
            .await
            .unwrap();
        let unrelated = encoder
            .encode("radiation shielding for crew quarters")
            .await
            .unwrap();

        assert!(cosine(&base, &related) > cosine(&base, &unrelated));
    }

    #[tokio::test]
    async fn test_hash_encoder_case_insensitive_tokens() {
        let encoder = HashEncoder::new();
        let v1 = encoder.encode("Microgravity Plant").await.unwrap();
        let v2 = encoder.encode("microgravity plant").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_hash_dimensions() {
        let encoder = HashEncoder::new();
        assert_eq!(TextEncoder::dimensions(&encoder), 384);
    }

    #[test]
    fn test_onnx_missing_model() {
        let result = OnnxTextEncoder::from_directory(Path::new("/nonexistent"), 512);
        assert!(result.is_err());
    }
}
