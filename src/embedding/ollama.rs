//! Ollama embedding backend.

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::llm::{LlmHttpConfig, build_http_client};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Embedder backed by a local Ollama instance.
#[derive(Debug)]
pub struct OllamaEmbedder {
    /// API endpoint.
    endpoint: String,
    /// Embedding model to use.
    model: String,
    /// Vector dimensions the model produces.
    dimensions: usize,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default embedding model.
    pub const DEFAULT_MODEL: &'static str = "nomic-embed-text";

    /// Dimensions of the default model.
    pub const DEFAULT_DIMENSIONS: usize = 768;

    /// Creates a new Ollama embedder.
    #[must_use]
    pub fn new() -> Self {
        let endpoint =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        Self {
            endpoint,
            model: Self::DEFAULT_MODEL.to_string(),
            dimensions: Self::DEFAULT_DIMENSIONS,
            client: build_http_client(LlmHttpConfig::from_env()),
        }
    }

    /// Creates an embedder from configuration.
    #[must_use]
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let mut embedder = Self::new();
        if let Some(endpoint) = &config.endpoint {
            embedder.endpoint = endpoint.clone();
        }
        if let Some(model) = &config.model {
            embedder.model = model.clone();
        }
        embedder
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the expected vector dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| {
                tracing::error!(
                    provider = "ollama",
                    model = %self.model,
                    error = %e,
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "Embedding request failed"
                );
                Error::OperationFailed {
                    operation: "ollama_embed".to_string(),
                    cause: e.to_string(),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::OperationFailed {
                operation: "ollama_embed".to_string(),
                cause: format!("API returned status: {status}"),
            });
        }

        let response: EmbeddingResponse =
            response.json().map_err(|e| Error::OperationFailed {
                operation: "ollama_embed_response".to_string(),
                cause: e.to_string(),
            })?;

        Ok(response.embedding)
    }
}

/// Request to the Embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

/// Response from the Embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}
