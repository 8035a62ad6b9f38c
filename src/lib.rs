#![deny(missing_docs)]

//! Core library for the RAG document server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and provider adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// PDF text extraction.
pub mod pdf;
/// Document processing pipeline utilities.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Temporary upload handling and collection id derivation.
pub mod uploads;
