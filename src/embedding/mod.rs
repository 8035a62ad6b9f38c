//! Embedding client abstraction and provider adapters.
//!
//! The pipeline talks to one of two backends through [`EmbeddingClient`]: a local
//! Ollama runtime or the hosted OpenAI embeddings API. Both adapters issue plain
//! HTTP requests; no model inference happens in this process.

mod ollama;
mod openai;

use crate::config::{EmbeddingProvider, get_config};
use async_trait::async_trait;
use thiserror::Error;

pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unreachable or refused the connection.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or was inconsistent with the request.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client() -> Box<dyn EmbeddingClient + Send + Sync> {
    let config = get_config();
    match config.embedding_provider {
        EmbeddingProvider::Ollama => Box::new(OllamaEmbeddingClient::from_config(config)),
        EmbeddingProvider::OpenAI => Box::new(OpenAiEmbeddingClient::from_config(config)),
    }
}

pub(crate) fn ensure_batch_matches(
    requested: usize,
    produced: usize,
) -> Result<(), EmbeddingClientError> {
    if requested == produced {
        Ok(())
    } else {
        Err(EmbeddingClientError::InvalidResponse(format!(
            "requested {requested} embeddings, provider returned {produced}"
        )))
    }
}
