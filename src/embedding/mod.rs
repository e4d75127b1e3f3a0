//! Embedding generation.
//!
//! Embeddings are an optional retrieval aid. The default backend returns
//! empty vectors, which keeps retrieval purely graph-based. The Ollama
//! backend produces dense vectors for semantic seed ranking.

mod fallback;
mod ollama;

pub use fallback::FallbackEmbedder;
pub use ollama::OllamaEmbedder;

use crate::config::EmbeddingConfig;
use crate::{Error, Result};

/// Trait for embedding generators.
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Returns the embedding dimensions.
    ///
    /// Zero means the backend produces no embeddings and callers should
    /// fall back to graph-only retrieval.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Builds an embedder from configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the configured provider is unknown.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "none" => Ok(Box::new(FallbackEmbedder::new())),
        "ollama" => Ok(Box::new(OllamaEmbedder::from_config(config))),
        other => Err(Error::InvalidInput(format!(
            "unknown embedding provider '{other}' (expected 'none' or 'ollama')"
        ))),
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector is empty or zero-length, so fallback
/// embeddings never influence ranking.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
