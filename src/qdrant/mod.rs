//! Qdrant vector store integration over its HTTP API.

mod client;
mod payload;
mod types;

pub use client::QdrantService;
pub use types::{PointInsert, QdrantError, ScoredPoint};
