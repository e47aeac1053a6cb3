
pub mod ollama;

use tracing::debug;

use crate::{RagError, Result};

/// The pluggable embedding model seam. Implemented by [`ollama::OllamaClient`]
/// in production and by deterministic stubs in tests.
pub trait EmbeddingModel {
    /// Map a batch of texts to raw embedding vectors, one per input, in input
    /// order. Raw vector width is model-defined and may vary; the [`Embedder`]
    /// normalizes it.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embeds text batches and enforces the fixed-dimension contract the vector
/// index depends on. Every vector leaving this type has exactly `dimension`
/// components.
pub struct Embedder {
    model: Box<dyn EmbeddingModel>,
    dimension: usize,
}

impl Embedder {
    #[inline]
    pub fn new(model: Box<dyn EmbeddingModel>, dimension: usize) -> Self {
        Self { model, dimension }
    }

    /// The dimension every produced vector is normalized to.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a batch of texts. Output row `i` corresponds to input `i`.
    ///
    /// An empty or count-mismatched model response is an error: callers must
    /// never index a partial batch.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.model.embed_batch(texts)?;

        if raw.is_empty() {
            return Err(RagError::Embedding(
                "model returned no vectors".to_string(),
            ));
        }
        if raw.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "model returned {} vectors for {} inputs",
                raw.len(),
                texts.len()
            )));
        }

        debug!(
            "Embedded {} texts, normalizing to dimension {}",
            texts.len(),
            self.dimension
        );

        Ok(raw
            .into_iter()
            .map(|v| normalize_dimension(v, self.dimension))
            .collect())
    }

    #[inline]
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vectors".to_string()))
    }
}

/// Force a vector to exactly `target` components: truncate trailing
/// components when over-length, zero-fill the tail when under-length.
/// Required whenever the embedding source does not guarantee constant width.
#[inline]
pub fn normalize_dimension(mut vector: Vec<f32>, target: usize) -> Vec<f32> {
    vector.truncate(target);
    vector.resize(target, 0.0);
    vector
}
