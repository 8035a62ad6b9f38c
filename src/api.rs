//! HTTP surface for the RAG server.
//!
//! This module exposes a compact Axum router with the service's endpoints:
//!
//! - `POST /process/` – Accept a multipart PDF upload, extract page text, chunk it,
//!   generate embeddings, and persist them in a per-document Qdrant collection.
//!   Returns `201` with `{collection_id, chunks_indexed, filename}`.
//! - `POST /retrieve/` – Answer a similarity query against a named collection and
//!   return the best-matching sources with positional metadata.
//! - `GET /get-text/{collection_id}` – Reconstruct the full document text from the
//!   indexed chunks. The original upload is never retained, so this concatenates
//!   chunks in extraction order.
//! - `GET /health` – Liveness probe.
//!
//! Failures map to FastAPI-style `{"detail": ...}` bodies: non-PDF uploads are `400`,
//! empty extractions and any retrieval failure are `404`.

use crate::config::get_config;
use crate::processing::{ProcessingApi, ProcessingError, Source};
use crate::uploads;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_TOP_K: usize = 3;

/// Build the HTTP router exposing the ingestion and retrieval API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/process/", post(process_pdf::<S>))
        .route("/retrieve/", post(retrieve_chunks::<S>))
        .route("/get-text/:collection_id", get(get_text::<S>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Success response for the `POST /process/` endpoint.
#[derive(Serialize)]
struct ProcessResponse {
    /// Identifier of the collection the document was indexed into.
    collection_id: String,
    /// Number of chunks persisted for the document.
    chunks_indexed: usize,
    /// Original filename of the upload.
    filename: String,
}

/// Process an uploaded PDF: validate, park it on disk, and run the ingestion pipeline.
///
/// The temp file is removed when the upload guard goes out of scope, whether or not
/// processing succeeded.
async fn process_pdf<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProcessResponse>), ApiError>
where
    S: ProcessingApi,
{
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::BadRequest(format!("Malformed multipart body: {error}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_owned)
                .ok_or_else(|| ApiError::BadRequest("Uploaded file has no filename.".into()))?;
            let bytes = field.bytes().await.map_err(|error| {
                ApiError::BadRequest(format!("Failed to read uploaded file: {error}"))
            })?;
            upload = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided.".into()))?;

    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest(
            "Invalid file type. Only PDFs are accepted.".into(),
        ));
    }

    let config = get_config();
    // The id must observe the directory mtime before the save below refreshes it.
    let collection_id = uploads::derive_collection_id(&config.uploads_dir, &filename);
    let saved = uploads::save_upload(&config.uploads_dir, &filename, &bytes)
        .map_err(|error| ApiError::Internal(format!("Failed to save upload: {error}")))?;

    let outcome = service
        .process_pdf_file(&collection_id, &filename, saved.path())
        .await?;

    tracing::info!(
        collection = collection_id,
        filename,
        chunks = outcome.chunks_indexed,
        "Process request completed"
    );
    Ok((
        StatusCode::CREATED,
        Json(ProcessResponse {
            collection_id,
            chunks_indexed: outcome.chunks_indexed,
            filename,
        }),
    ))
}

/// Request body for the `POST /retrieve/` endpoint.
#[derive(Deserialize)]
struct RetrieveRequest {
    /// Collection to search.
    collection_id: String,
    /// Natural language question to embed and match.
    question: String,
    /// Maximum number of sources to return.
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Success response for the `POST /retrieve/` endpoint.
#[derive(Serialize)]
struct RetrieveResponse {
    /// Best-matching chunks in similarity ranking order.
    sources: Vec<Source>,
}

/// Answer a similarity query against a named collection.
///
/// Every retrieval failure collapses to a generic 404: the common cause is an unknown
/// collection id, and the caller cannot act on finer distinctions.
async fn retrieve_chunks<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError>
where
    S: ProcessingApi,
{
    let RetrieveRequest {
        collection_id,
        question,
        top_k,
    } = request;

    let sources = service
        .retrieve(&collection_id, &question, top_k)
        .await
        .map_err(|error| {
            tracing::warn!(collection = collection_id, error = %error, "Retrieve failed");
            ApiError::NotFound(format!(
                "Collection '{collection_id}' not found or error during retrieval."
            ))
        })?;

    tracing::info!(
        collection = collection_id,
        results = sources.len(),
        "Retrieve request completed"
    );
    Ok(Json(RetrieveResponse { sources }))
}

/// Success response for the `GET /get-text/{collection_id}` endpoint.
#[derive(Serialize)]
struct GetTextResponse {
    /// Document text reconstructed from the indexed chunks.
    text: String,
}

/// Reconstruct the full document text for a collection.
async fn get_text<S>(
    State(service): State<Arc<S>>,
    Path(collection_id): Path<String>,
) -> Result<Json<GetTextResponse>, ApiError>
where
    S: ProcessingApi,
{
    let text = service
        .collection_text(&collection_id)
        .await
        .map_err(|error| {
            tracing::warn!(collection = collection_id, error = %error, "Get-text failed");
            ApiError::NotFound(format!("Collection '{collection_id}' not found."))
        })?;
    Ok(Json(GetTextResponse { text }))
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Error surfaced to HTTP clients as a FastAPI-style `{"detail": ...}` body.
enum ApiError {
    /// Request was malformed or the upload was not a PDF.
    BadRequest(String),
    /// The requested resource does not exist or yielded nothing.
    NotFound(String),
    /// An unexpected pipeline failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(error: ProcessingError) -> Self {
        match error {
            ProcessingError::EmptyDocument => {
                Self::NotFound("Could not extract any text from the PDF.".into())
            }
            other => {
                tracing::error!(error = %other, "Ingestion failed");
                Self::Internal(other.to_string())
            }
        }
    }
}
