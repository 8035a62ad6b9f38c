//! Core data types and error definitions for the processing pipeline.

use crate::{embedding::EmbeddingClientError, pdf::PdfError, qdrant::QdrantError};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Text extraction failed for the uploaded PDF.
    #[error("Failed to read PDF: {0}")]
    Pdf(#[from] PdfError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the input text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant interaction failed during ingestion.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// No text could be extracted from the document.
    #[error("Could not extract any text from the PDF")]
    EmptyDocument,
    /// Produced embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
}

/// Errors emitted while answering retrieval queries.
///
/// All variants collapse to a generic not-found response at the HTTP edge; the
/// distinction exists for logging.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The named collection does not exist in Qdrant.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),
    /// Embedding provider failed to return a vector for the question.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant search request returned an error response.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Number of chunks indexed for the document.
    pub chunks_indexed: usize,
}

/// One retrieved chunk returned to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    /// Identifier of the indexed chunk.
    pub id: String,
    /// Source document filename.
    pub filename: String,
    /// 1-indexed page number the chunk was extracted from.
    pub page_number: usize,
    /// Similarity score reported by the vector store.
    pub score: f32,
    /// Stored chunk text.
    pub text_snippet: String,
}
