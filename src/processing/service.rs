//! Processing service coordinating extraction, chunking, embedding, and Qdrant operations.

use crate::{
    config::get_config,
    embedding::{EmbeddingClient, get_embedding_client},
    metrics::IngestMetrics,
    pdf::{self, PageText},
    processing::{
        chunking::{chunk_text, determine_chunk_params},
        mappers::{assemble_document_text, map_scored_point},
        types::{IngestOutcome, ProcessingError, RetrieveError, Source},
    },
    qdrant::{PointInsert, QdrantService},
};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Coordinates the full ingestion and retrieval pipeline.
///
/// The service owns long-lived handles to the embedding client, Qdrant transport, and
/// metrics registry so every request handler reuses the same components. Construct it
/// once near process start and share it through an `Arc`.
pub struct ProcessingService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant_service: QdrantService,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the processing pipeline used by the HTTP surface.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Extract, chunk, embed, and index the PDF saved at `path`.
    async fn process_pdf_file(
        &self,
        collection_name: &str,
        filename: &str,
        path: &Path,
    ) -> Result<IngestOutcome, ProcessingError>;

    /// Answer a similarity query against the named collection.
    async fn retrieve(
        &self,
        collection_name: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<Source>, RetrieveError>;

    /// Reconstruct the full document text from the indexed chunks of a collection.
    async fn collection_text(&self, collection_name: &str) -> Result<String, RetrieveError>;
}

impl ProcessingService {
    /// Build a new processing service, initializing backing clients as needed.
    pub fn new() -> Self {
        tracing::info!("Initializing embedding client");
        let embedding_client = get_embedding_client();
        let qdrant_service = QdrantService::new().expect("Failed to connect to Qdrant");

        Self {
            embedding_client,
            qdrant_service,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Chunk, embed, and index already-extracted pages into the target collection.
    pub async fn ingest_pages(
        &self,
        collection_name: &str,
        filename: &str,
        pages: Vec<PageText>,
    ) -> Result<IngestOutcome, ProcessingError> {
        tracing::info!(collection = collection_name, filename, "Processing document");
        let config = get_config();
        let (chunk_size, overlap) = determine_chunk_params(
            config.text_splitter_chunk_size,
            config.text_splitter_chunk_overlap,
        );
        tracing::debug!(chunk_size, overlap, "Derived chunk parameters");

        let mut page_chunks: Vec<(usize, String)> = Vec::new();
        for page in pages {
            for chunk in chunk_text(&page.text, chunk_size, overlap, &config.embedding_model)? {
                if !chunk.trim().is_empty() {
                    page_chunks.push((page.page_number, chunk));
                }
            }
        }

        if page_chunks.is_empty() {
            return Err(ProcessingError::EmptyDocument);
        }

        self.qdrant_service
            .create_collection_if_not_exists(collection_name, config.embedding_dimension as u64)
            .await?;

        let texts: Vec<String> = page_chunks
            .iter()
            .map(|(_, chunk)| chunk.clone())
            .collect();
        let embeddings = self.embedding_client.generate_embeddings(texts).await?;
        debug_assert_eq!(page_chunks.len(), embeddings.len());

        let expected = config.embedding_dimension;
        if let Some(vector) = embeddings.first()
            && vector.len() != expected
        {
            return Err(ProcessingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let points: Vec<PointInsert> = page_chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, ((page_number, text), vector))| PointInsert {
                text,
                filename: filename.to_string(),
                page_number,
                chunk_index,
                vector,
            })
            .collect();

        let chunks_indexed = self
            .qdrant_service
            .index_points(collection_name, points)
            .await?;

        self.metrics.record_document(chunks_indexed as u64);
        let totals = self.metrics.snapshot();
        tracing::info!(
            collection = collection_name,
            filename,
            chunks = chunks_indexed,
            chunk_size,
            documents_total = totals.documents_indexed,
            chunks_total = totals.chunks_indexed,
            "Document indexed"
        );

        Ok(IngestOutcome { chunks_indexed })
    }

    /// Execute a similarity search and map the hits to source records.
    pub async fn retrieve(
        &self,
        collection_name: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<Source>, RetrieveError> {
        let config = get_config();
        if !self.qdrant_service.collection_exists(collection_name).await? {
            return Err(RetrieveError::CollectionNotFound(
                collection_name.to_string(),
            ));
        }

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(RetrieveError::EmptyEmbedding)?;

        let limit = top_k.clamp(1, config.retrieve_max_top_k);
        let hits = self
            .qdrant_service
            .search_points(collection_name, vector, limit)
            .await?;

        Ok(hits.into_iter().map(map_scored_point).collect())
    }

    /// Reconstruct a collection's document text from its stored chunks.
    pub async fn collection_text(&self, collection_name: &str) -> Result<String, RetrieveError> {
        if !self.qdrant_service.collection_exists(collection_name).await? {
            return Err(RetrieveError::CollectionNotFound(
                collection_name.to_string(),
            ));
        }

        let payloads = self
            .qdrant_service
            .scroll_payloads(collection_name, json!(["text", "page_number", "chunk_index"]))
            .await?;

        Ok(assemble_document_text(payloads))
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn process_pdf_file(
        &self,
        collection_name: &str,
        filename: &str,
        path: &Path,
    ) -> Result<IngestOutcome, ProcessingError> {
        let pages = pdf::extract_pages(path)?;
        self.ingest_pages(collection_name, filename, pages).await
    }

    async fn retrieve(
        &self,
        collection_name: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<Source>, RetrieveError> {
        ProcessingService::retrieve(self, collection_name, question, top_k).await
    }

    async fn collection_text(&self, collection_name: &str) -> Result<String, RetrieveError> {
        ProcessingService::collection_text(self, collection_name).await
    }
}
