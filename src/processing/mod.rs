//! Document processing pipeline: extraction, chunking, embedding, and Qdrant orchestration.

pub mod chunking;
mod mappers;
mod service;
pub mod types;

pub use service::{ProcessingApi, ProcessingService};
pub use types::{ChunkingError, IngestOutcome, ProcessingError, RetrieveError, Source};
