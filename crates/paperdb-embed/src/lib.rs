//! Embedding batcher: turns fragment texts into fixed-dimension vectors.
//!
//! Two [`Embedder`] implementations share the batching contract: the
//! candle-backed BGE-M3 model in [`model`] and the deterministic hashing
//! embedder in [`hash`] used for tests and model-less machines. Cosine
//! similarity lives here too since it operates on the vectors the
//! batcher produces.

pub mod hash;
pub mod model;
mod pooling;

pub use hash::HashEmbedder;
pub use model::EmbeddingModel;
pub use pooling::masked_mean_l2;

use paperdb_core::config::EmbeddingSettings;
use paperdb_core::error::{PipelineError, Result};
use paperdb_core::traits::Embedder;

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Cosine similarity between two vectors: `dot(a,b) / (|a|*|b|)`.
///
/// Errors on mismatched dimensions or a zero-norm input rather than
/// returning NaN.
pub fn similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(PipelineError::Embedding(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(PipelineError::Embedding(
            "cosine similarity undefined for zero-norm vector".to_string(),
        ));
    }

    Ok(dot / (norm_a * norm_b))
}

/// Build the embedder the configuration asks for.
///
/// `PAPERDB_EMBEDDING__USE_HASH_EMBEDDER=1` (or the config key) selects
/// the hashing embedder; otherwise the candle model is loaded from
/// `model_dir`.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> anyhow::Result<Box<dyn Embedder>> {
    if settings.use_hash_embedder {
        tracing::info!(dim = settings.dimension, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dimension)));
    }
    let model = EmbeddingModel::load(settings.model_dir.as_deref(), settings.dimension)?;
    Ok(Box::new(model))
}
