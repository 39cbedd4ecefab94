use async_trait::async_trait;

use cognee_common::config::EmbeddingConfig;

use super::{EmbeddingEngine, EmbeddingError};

/// Stand-in for an on-box model: deterministic, network-free hashing
/// embedding. Real local model loading (ONNX/candle weight loading) is out
/// of scope — the contract this crate owns is fixed dimension and never
/// touching the network, which this adapter satisfies exactly, unlike a
/// loopback-HTTP shim that would still depend on an external process.
pub struct LocalEmbeddingEngine {
    dimensions: u32,
}

impl LocalEmbeddingEngine {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            dimensions: config.dimensions,
        }
    }

    /// Hash `text` into a fixed-length, L2-normalized vector. Each dimension
    /// is seeded by mixing the word's hash with its dimension index, so the
    /// same text always yields the same vector and similar token sets yield
    /// vectors with nonzero cosine similarity.
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};

        let mut components = vec![0.0_f32; self.dimensions as usize];
        for token in text.split_whitespace() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let seed = hasher.finish();
            let dim = (seed as usize) % components.len().max(1);
            let sign = if seed & 1 == 0 { 1.0 } else { -1.0 };
            components[dim] += sign;
        }

        let norm = components.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > 0.0 {
            for c in &mut components {
                *c /= norm;
            }
        }
        components
    }
}

#[async_trait]
impl EmbeddingEngine for LocalEmbeddingEngine {
    fn get_vector_size(&self) -> u32 {
        self.dimensions
    }

    async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
