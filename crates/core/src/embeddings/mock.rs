use async_trait::async_trait;

use super::{EmbeddingEngine, EmbeddingError};

/// Null embedding engine: returns zero-vectors of the configured dimension
/// without ever touching the network. Selected when `EmbeddingConfig.mock`
/// is set, or as the fallback for an unrecognized provider name.
pub struct MockEmbeddingEngine {
    dimensions: u32,
}

impl MockEmbeddingEngine {
    pub fn new(dimensions: u32) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingEngine for MockEmbeddingEngine {
    fn get_vector_size(&self) -> u32 {
        self.dimensions
    }

    async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|_| vec![0.0_f32; self.dimensions as usize])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_zero_vectors_of_configured_dimension() {
        let engine = MockEmbeddingEngine::new(8);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = engine.embed_text(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        for vec in vectors {
            assert_eq!(vec.len(), 8);
            assert!(vec.iter().all(|&x| x == 0.0));
        }
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let engine = MockEmbeddingEngine::new(4);
        assert!(engine.embed_text(&[]).await.unwrap().is_empty());
    }
}
